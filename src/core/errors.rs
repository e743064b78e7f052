/*!
# Error System for Metadata Search

Typed errors for every stage of the pipeline: per-file load failures,
query-boundary failures and best-effort cache persistence failures.
*/

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Ошибка загрузки одного файла метаданных.
///
/// Никогда не прерывает загрузку остальных файлов: попадает в [`LoadReport`]
/// и исключает только свой файл из набора конфигураций.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadError {
    #[error("failed to read '{file}': {message}")]
    Io { file: String, message: String },

    #[error("malformed JSON in '{file}': {message}")]
    Parse { file: String, message: String },

    #[error("'{file}': top-level JSON value must be an object")]
    NotAnObject { file: String },

    #[error("'{file}': required field '{field}' is missing")]
    MissingField { file: String, field: String },

    #[error("'{file}': section '{section}' has invalid structure: {message}")]
    InvalidSection {
        file: String,
        section: String,
        message: String,
    },

    #[error("'{file}': object '{full_name}' is declared more than once")]
    DuplicateObject { file: String, full_name: String },

    /// Файл изменился после индексации; нужна перестройка снимка
    #[error("'{file}' changed since it was indexed")]
    SourceChanged { file: String },
}

impl LoadError {
    /// Идентификатор файла, к которому относится ошибка
    pub fn file(&self) -> &str {
        match self {
            LoadError::Io { file, .. }
            | LoadError::Parse { file, .. }
            | LoadError::NotAnObject { file }
            | LoadError::MissingField { file, .. }
            | LoadError::InvalidSection { file, .. }
            | LoadError::DuplicateObject { file, .. }
            | LoadError::SourceChanged { file } => file,
        }
    }
}

/// Ошибки на границе запроса `metadata_search`.
///
/// `Ambiguous`, `ConfigNotFound` и `NoMatch` ошибками не являются и
/// возвращаются как варианты [`crate::search::SearchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("search exceeded its deadline")]
    TimedOut,

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Ошибка записи кэша индекса. Логируется и проглатывается, запросы не блокирует.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Итог загрузки каталога: какие файлы загружены, какие отброшены и почему
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<LoadError>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_loaded(&mut self, file: impl Into<String>) {
        self.loaded.push(file.into());
    }

    pub fn record_failure(&mut self, error: LoadError) {
        self.failed.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_files(&self) -> Vec<&str> {
        self.failed.iter().map(LoadError::file).collect()
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "loaded: {}, failed: {}",
            self.loaded.len(),
            self.failed.len()
        )?;
        for error in &self.failed {
            writeln!(f, "  {}", error)?;
        }
        Ok(())
    }
}
