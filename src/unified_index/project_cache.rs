use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::configuration_watcher::INDEX_FILE_NAME;
use super::index::{ConfigIndex, ConfigIndexEntry, FailedSource};
use crate::core::CacheError;

/// Версия формата файла кэша; другая версия считается отсутствием кэша
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Содержимое `metadata_configs_index.json`
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheDocument {
    pub format_version: u32,
    /// Служебное поле перестройки, в сравнении индексов не участвует
    pub generated_at: DateTime<Utc>,
    pub source_dir: String,
    pub configs: Vec<ConfigIndexEntry>,
    #[serde(default)]
    pub failed: Vec<FailedSource>,
}

/// Кэш индекса конфигураций в каталоге dist.
///
/// Кэш производный: удаление файла ничего не теряет, индекс восстанавливается
/// из исходных выгрузок.
#[derive(Debug, Clone)]
pub struct ProjectIndexCache {
    cache_dir: PathBuf,
}

impl ProjectIndexCache {
    /// Если каталог dist создать нельзя, используется пользовательский каталог кэша
    pub fn new(dist_dir: &Path) -> Self {
        if let Err(e) = fs::create_dir_all(dist_dir) {
            tracing::warn!(
                "Cannot create dist directory {}: {}",
                dist_dir.display(),
                e
            );
            if let Some(fallback) = dirs::cache_dir().map(|dir| dir.join("bsl-metadata")) {
                if fs::create_dir_all(&fallback).is_ok() {
                    tracing::info!("Using fallback cache directory {}", fallback.display());
                    return Self {
                        cache_dir: fallback,
                    };
                }
            }
        }
        Self {
            cache_dir: dist_dir.to_path_buf(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(INDEX_FILE_NAME)
    }

    /// Читает кэш. Любая проблема (нет файла, битый JSON, другая версия)
    /// означает "кэша нет".
    pub fn load(&self) -> Option<ConfigIndex> {
        let path = self.cache_file();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No index cache at {}: {}", path.display(), e);
                return None;
            }
        };

        let document: CacheDocument = match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Ignoring unreadable index cache {}: {}", path.display(), e);
                return None;
            }
        };

        if document.format_version != CACHE_FORMAT_VERSION {
            tracing::info!(
                "Ignoring index cache with format version {} (expected {})",
                document.format_version,
                CACHE_FORMAT_VERSION
            );
            return None;
        }

        Some(ConfigIndex::from_parts(document.configs, document.failed))
    }

    /// Записывает кэш через временный файл и переименование
    pub fn persist(&self, index: &ConfigIndex, source_dir: &Path) -> Result<PathBuf, CacheError> {
        let document = CacheDocument {
            format_version: CACHE_FORMAT_VERSION,
            generated_at: Utc::now(),
            source_dir: source_dir.to_string_lossy().to_string(),
            configs: index.entries().cloned().collect(),
            failed: index.failed().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        let path = self.cache_file();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|source| CacheError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Запись кэша без влияния на обслуживание запросов: ошибка только логируется
    pub fn persist_best_effort(&self, index: &ConfigIndex, source_dir: &Path) {
        match self.persist(index, source_dir) {
            Ok(path) => tracing::debug!("Index cache written to {}", path.display()),
            Err(e) => tracing::warn!("Index cache not written: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::load_directory;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_persist_and_reload() {
        let source = TempDir::new().unwrap();
        let dist = TempDir::new().unwrap();
        fs::write(
            source.path().join("upp.json"),
            r#"{"Имя": "УПП", "Справочники": [{"Имя": "Номенклатура"}]}"#,
        )
        .unwrap();
        fs::write(source.path().join("bad.json"), "[]").unwrap();

        let index = ConfigIndex::build(&load_directory(source.path()).unwrap());
        let cache = ProjectIndexCache::new(dist.path());
        let path = cache.persist(&index, source.path()).unwrap();
        assert!(path.ends_with(INDEX_FILE_NAME));

        let reloaded = cache.load().unwrap();
        assert_eq!(reloaded, index);
    }

    #[test]
    fn test_missing_or_foreign_cache_is_absent() {
        let dist = TempDir::new().unwrap();
        let cache = ProjectIndexCache::new(dist.path());
        assert!(cache.load().is_none());

        fs::write(cache.cache_file(), "{\"configs\": []}").unwrap();
        assert!(cache.load().is_none());

        fs::write(
            cache.cache_file(),
            r#"{"format_version": 99, "generated_at": "2024-01-01T00:00:00Z", "source_dir": "x", "configs": []}"#,
        )
        .unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dist = TempDir::new().unwrap();
        let cache = ProjectIndexCache::new(dist.path());
        // Каталог на месте файла кэша делает rename невозможным
        fs::create_dir(cache.cache_file()).unwrap();
        fs::write(cache.cache_file().join("occupied"), "x").unwrap();

        let result = cache.persist(&ConfigIndex::new(), dist.path());
        assert!(matches!(result, Err(CacheError::Write { .. })));
        cache.persist_best_effort(&ConfigIndex::new(), dist.path());
    }
}
