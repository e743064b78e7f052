//! Неизменяемый снимок состояния сервиса.
//!
//! Снимок объединяет набор исходников, индекс конфигураций, отчёт загрузки и
//! деревья конфигураций. Запрос работает с одним снимком от начала до конца;
//! перестройка публикует новый снимок целиком, старый живёт, пока на него
//! есть ссылки.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::configuration_watcher::{SourceFile, SourceSet};
use super::index::ConfigIndex;
use super::project_cache::ProjectIndexCache;
use crate::configuration::{load_file, load_sources};
use crate::core::{LoadError, LoadReport, SearchError, SourceSignature};
use crate::search::SearchableConfiguration;

/// Дерево одной конфигурации, загружаемое при первом обращении
#[derive(Debug)]
pub struct LazyConfiguration {
    source: SourceFile,
    cell: OnceCell<Arc<SearchableConfiguration>>,
}

impl LazyConfiguration {
    fn pending(source: SourceFile) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    fn ready(source: SourceFile, config: SearchableConfiguration) -> Self {
        Self {
            source,
            cell: OnceCell::with_value(Arc::new(config)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Возвращает дерево, при необходимости разбирая файл. Файл с подписью,
    /// отличной от проиндексированной, не разбирается: вызывающий получает
    /// [`LoadError::SourceChanged`] и должен перестроить снимок.
    pub fn get(&self) -> Result<Arc<SearchableConfiguration>, SearchError> {
        self.cell
            .get_or_try_init(|| {
                tracing::debug!("Loading configuration '{}' on demand", self.source.file_id);
                self.ensure_unchanged()?;
                load_file(&self.source)
                    .map(|config| Arc::new(SearchableConfiguration::new(config)))
            })
            .map(Arc::clone)
            .map_err(SearchError::from)
    }
}

impl LazyConfiguration {
    fn ensure_unchanged(&self) -> Result<(), LoadError> {
        let current = SourceSignature::of(&self.source.path).map_err(|e| LoadError::Io {
            file: self.source.file_id.clone(),
            message: e.to_string(),
        })?;
        if current != self.source.signature {
            tracing::info!(
                "Source '{}' changed since indexing ({:?} -> {:?})",
                self.source.file_id,
                self.source.signature,
                current
            );
            return Err(LoadError::SourceChanged {
                file: self.source.file_id.clone(),
            });
        }
        Ok(())
    }
}

/// Опубликованный снимок
#[derive(Debug, Default)]
pub struct MetadataSnapshot {
    sources: SourceSet,
    index: ConfigIndex,
    report: LoadReport,
    configurations: BTreeMap<String, LazyConfiguration>,
}

impl MetadataSnapshot {
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn index(&self) -> &ConfigIndex {
        &self.index
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn configuration(&self, file_id: &str) -> Option<&LazyConfiguration> {
        self.configurations.get(file_id)
    }

    pub fn loaded_count(&self) -> usize {
        self.configurations.values().filter(|c| c.is_loaded()).count()
    }

    /// Снимок, построенный полной загрузкой: деревья уже готовы
    pub fn from_sources(sources: SourceSet) -> Self {
        let outcome = load_sources(sources);
        let index = ConfigIndex::build(&outcome);

        let mut configurations = BTreeMap::new();
        for (file_id, config) in outcome.configurations {
            if let Some(source) = outcome.sources.get(&file_id) {
                configurations.insert(
                    file_id,
                    LazyConfiguration::ready(source.clone(), SearchableConfiguration::new(config)),
                );
            }
        }

        Self {
            sources: outcome.sources,
            index,
            report: outcome.report,
            configurations,
        }
    }

    /// Снимок из действительного кэша: деревья будут разобраны по требованию
    pub fn from_cache(sources: SourceSet, index: ConfigIndex) -> Self {
        let configurations = index
            .entries()
            .filter_map(|entry| sources.get(&entry.file))
            .map(|source| {
                (
                    source.file_id.clone(),
                    LazyConfiguration::pending(source.clone()),
                )
            })
            .collect();

        Self {
            report: index.load_report(),
            sources,
            index,
            configurations,
        }
    }
}

/// Строит снимок: сканирование, затем кэш, если его подписи совпадают с
/// каталогом, иначе полная загрузка с записью нового кэша.
pub fn build_snapshot(input_dir: &Path, cache: &ProjectIndexCache) -> Result<MetadataSnapshot> {
    let start = Instant::now();
    let sources = SourceSet::scan(input_dir)?;

    if let Some(index) = cache.load() {
        if index.is_valid_for(&sources) {
            tracing::info!(
                "Using cached config index: {} configurations ({:?})",
                index.len(),
                start.elapsed()
            );
            return Ok(MetadataSnapshot::from_cache(sources, index));
        }
        tracing::info!("Config index cache is stale, rebuilding");
    }

    let snapshot = MetadataSnapshot::from_sources(sources);
    cache.persist_best_effort(&snapshot.index, input_dir);

    tracing::info!(
        "Built metadata snapshot: {} loaded, {} failed ({:?})",
        snapshot.report.loaded.len(),
        snapshot.report.failed.len(),
        start.elapsed()
    );

    Ok(snapshot)
}
