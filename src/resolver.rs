/*!
# Config Resolver

Выбор одной конфигурации по необязательному селектору пользователя.

Уровни сопоставления (первый уровень с совпадениями решает исход):

1. идентификатор файла, с расширением `.json` или без;
2. точное Имя или Синоним конфигурации;
3. вхождение подстроки в Имя, Синоним или идентификатор файла.

Все сравнения без учёта регистра и с нормализованными пробелами. Если на уровне
больше одного совпадения, возвращается неоднозначность со списком кандидатов:
резолвер никогда не выбирает молча.
*/

use serde::Serialize;

use crate::normalizer::fold;
use crate::unified_index::{ConfigIndex, ConfigIndexEntry};

/// Конфигурация в списке кандидатов или доступных вариантов
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigCandidate {
    pub file: String,
    pub name: String,
    pub synonym: String,
}

impl From<&ConfigIndexEntry> for ConfigCandidate {
    fn from(entry: &ConfigIndexEntry) -> Self {
        Self {
            file: entry.file.clone(),
            name: entry.name.clone(),
            synonym: entry.synonym.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Selected(String),
    Ambiguous {
        selector: Option<String>,
        candidates: Vec<ConfigCandidate>,
    },
    NotFound {
        selector: Option<String>,
        available: Vec<ConfigCandidate>,
    },
}

fn strip_json_extension(selector: &str) -> &str {
    let split = selector.len().checked_sub(5).filter(|at| *at > 0);
    match split.and_then(|at| selector.get(at..).map(|ext| (at, ext))) {
        Some((at, ext)) if ext.eq_ignore_ascii_case(".json") => &selector[..at],
        _ => selector,
    }
}

/// Сопоставляет селектор с индексом конфигураций
pub fn resolve(index: &ConfigIndex, selector: Option<&str>) -> Resolution {
    let entries: Vec<&ConfigIndexEntry> = index.entries().collect();
    let available = || entries.iter().map(|e| ConfigCandidate::from(*e)).collect::<Vec<_>>();

    let selector = selector.map(str::trim).filter(|s| !s.is_empty());
    let Some(selector) = selector else {
        return match entries.as_slice() {
            [] => Resolution::NotFound {
                selector: None,
                available: Vec::new(),
            },
            [single] => Resolution::Selected(single.file.clone()),
            _ => Resolution::Ambiguous {
                selector: None,
                candidates: available(),
            },
        };
    };

    let file_key = fold(strip_json_extension(selector));
    let key = fold(selector);

    let tiers: [&dyn Fn(&ConfigIndexEntry) -> bool; 3] = [
        &|entry| fold(&entry.file) == file_key,
        &|entry| fold(&entry.name) == key || (!entry.synonym.is_empty() && fold(&entry.synonym) == key),
        &|entry| {
            fold(&entry.name).contains(&key)
                || fold(&entry.synonym).contains(&key)
                || fold(&entry.file).contains(&file_key)
        },
    ];

    for (level, matches) in tiers.iter().enumerate() {
        let hits: Vec<&ConfigIndexEntry> = entries.iter().copied().filter(|e| matches(e)).collect();
        match hits.as_slice() {
            [] => continue,
            [single] => {
                tracing::debug!(
                    "Config selector '{}' resolved to '{}' at level {}",
                    selector,
                    single.file,
                    level + 1
                );
                return Resolution::Selected(single.file.clone());
            }
            _ => {
                return Resolution::Ambiguous {
                    selector: Some(selector.to_string()),
                    candidates: hits.iter().map(|e| ConfigCandidate::from(*e)).collect(),
                }
            }
        }
    }

    Resolution::NotFound {
        selector: Some(selector.to_string()),
        available: available(),
    }
}

/// Текст-подсказка со списком доступных конфигураций
pub fn format_configs_info(candidates: &[ConfigCandidate]) -> String {
    let mut lines = vec!["Доступные конфигурации:".to_string()];
    if candidates.is_empty() {
        lines.push("- (конфигурации не найдены)".to_string());
    }
    for candidate in candidates {
        let mut line = format!("- {}", candidate.file);
        if !candidate.name.is_empty() {
            line.push_str(&format!(": {}", candidate.name));
        }
        if !candidate.synonym.is_empty() && candidate.synonym != candidate.name {
            line.push_str(&format!(" — {}", candidate.synonym));
        }
        lines.push(line);
    }
    lines.join("\n")
}
