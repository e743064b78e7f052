//! Модуль для форматирования и вывода результатов

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use crate::core::LoadReport;
use crate::resolver::{format_configs_info, ConfigCandidate};
use crate::search::{AttributeSummary, ObjectSummary, SearchResult};
use crate::service::ConfigSummary;

/// Формат вывода результатов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow::anyhow!("Unknown output format: {}", s)),
        }
    }
}

/// Writer для вывода результатов
pub struct OutputWriter {
    writer: Box<dyn Write>,
    format: OutputFormat,
}

impl OutputWriter {
    /// Создает writer для stdout
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(Box::new(io::stdout()), format)
    }

    pub fn new(writer: Box<dyn Write>, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Записывает сериализуемый объект как JSON
    pub fn write_object<T: Serialize>(&mut self, obj: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(obj)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Записывает строку
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        Ok(())
    }

    /// Записывает заголовок
    pub fn write_header(&mut self, header: &str) -> Result<()> {
        writeln!(self.writer, "\n{}", header.bold().blue())?;
        writeln!(
            self.writer,
            "{}",
            "=".repeat(header.chars().count()).blue()
        )?;
        Ok(())
    }

    /// Записывает таблицу
    pub fn write_table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        for (i, header) in headers.iter().enumerate() {
            if i > 0 {
                write!(self.writer, " │ ")?;
            }
            write!(self.writer, "{:width$}", header.bold(), width = widths[i])?;
        }
        writeln!(self.writer)?;

        for (i, width) in widths.iter().enumerate() {
            if i > 0 {
                write!(self.writer, "─┼─")?;
            }
            write!(self.writer, "{}", "─".repeat(*width))?;
        }
        writeln!(self.writer)?;

        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(self.writer, " │ ")?;
                }
                match widths.get(i) {
                    Some(width) => write!(self.writer, "{:width$}", cell, width = *width)?,
                    None => write!(self.writer, "{}", cell)?,
                }
            }
            writeln!(self.writer)?;
        }
        Ok(())
    }

    /// Результат поиска: JSON как есть или человекочитаемый текст
    pub fn write_search_result(&mut self, result: &SearchResult) -> Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_object(result);
        }

        match result {
            SearchResult::Matches(hits) => {
                for hit in hits {
                    self.write_object_summary(hit)?;
                }
            }
            SearchResult::NoMatch => {
                self.write_line(&"Объекты метаданных по запросу не найдены".yellow().to_string())?;
            }
            SearchResult::Ambiguous { candidates, .. } => {
                self.write_line(&"Найдено несколько конфигураций. Уточните параметр --config".yellow().to_string())?;
                self.write_candidates(candidates)?;
            }
            SearchResult::ConfigNotFound {
                selector,
                available,
            } => {
                let message = match selector {
                    Some(selector) => format!("Конфигурация '{}' не найдена", selector),
                    None => "Не найдены конфигурации".to_string(),
                };
                self.write_line(&message.red().to_string())?;
                self.write_candidates(available)?;
            }
        }
        Ok(())
    }

    fn write_candidates(&mut self, candidates: &[ConfigCandidate]) -> Result<()> {
        self.write_line("")?;
        self.write_line(&format_configs_info(candidates))
    }

    fn write_object_summary(&mut self, hit: &ObjectSummary) -> Result<()> {
        let title = if hit.synonym.is_empty() {
            hit.full_name.clone()
        } else {
            format!("{} ({})", hit.full_name, hit.synonym)
        };
        self.write_header(&title)?;
        self.write_line(&format!("{} {:?}", "match:".dimmed(), hit.tier))?;

        for attribute in &hit.attributes {
            self.write_line(&format!("  {}", describe_attribute(attribute)))?;
        }
        for section in &hit.tabular_sections {
            self.write_line(&format!("  {} {}", "ТЧ".cyan(), section.name.bold()))?;
            for attribute in &section.attributes {
                self.write_line(&format!("    {}", describe_attribute(attribute)))?;
            }
        }
        Ok(())
    }

    /// Список конфигураций и отчёт о загрузке
    pub fn write_configs(&mut self, configs: &[ConfigSummary], report: &LoadReport) -> Result<()> {
        if self.format == OutputFormat::Json {
            return self.write_object(&serde_json::json!({
                "configs": configs,
                "failed": report.failed,
            }));
        }

        let rows = configs
            .iter()
            .map(|c| {
                vec![
                    c.file.clone(),
                    c.name.clone(),
                    c.synonym.clone(),
                    c.version.clone(),
                    c.objects.to_string(),
                ]
            })
            .collect();
        self.write_table(&["file", "Имя", "Синоним", "Версия", "objects"], rows)?;

        for failure in &report.failed {
            self.write_line(&format!("{} {}", "failed:".red(), failure))?;
        }
        Ok(())
    }

    /// Завершает запись и сбрасывает буфер
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn describe_attribute(attribute: &AttributeSummary) -> String {
    let mut line = attribute.name.clone();
    if !attribute.synonym.is_empty() && attribute.synonym != attribute.name {
        line.push_str(&format!(" ({})", attribute.synonym));
    }
    if !attribute.types.is_empty() {
        line.push_str(&format!(": {}", attribute.types.join(" | ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::AttributeRole;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_describe_attribute() {
        let attribute = AttributeSummary {
            name: "Валюта".to_string(),
            synonym: "Валюта документа".to_string(),
            role: AttributeRole::Attribute,
            types: vec!["СправочникСсылка.Валюты".to_string(), "Строка".to_string()],
        };
        assert_eq!(
            describe_attribute(&attribute),
            "Валюта (Валюта документа): СправочникСсылка.Валюты | Строка"
        );
    }
}
