/*!
# Metadata Service

Контекст сервиса: настройки, опубликованный снимок и защита перестройки.

- Чтение не берёт блокировок: запрос один раз загружает `Arc` текущего снимка
  и работает с ним до конца.
- Перестройка собирает новый снимок в стороне и атомарно подменяет ссылку.
- Одновременные триггеры перестройки схлопываются: кто не взял
  `rebuild_lock`, продолжает обслуживать запросы текущим снимком.
- Изменения каталога проверяются лениво, не чаще `rescan_interval`.
*/

use anyhow::Result;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{LoadError, LoadReport, SearchError};
use crate::resolver::{resolve, ConfigCandidate, Resolution};
use crate::search::{self, SearchRequest, SearchResult};
use crate::settings::ServiceSettings;
use crate::unified_index::{build_snapshot, MetadataSnapshot, ProjectIndexCache, SourceSet};

/// Запрос поиска в терминах вызывающей стороны
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataQuery {
    pub query: String,
    pub config: Option<String>,
    /// `None` - лимит по умолчанию из настроек
    pub limit: Option<i64>,
    pub find_usages: bool,
}

impl MetadataQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            config: None,
            limit: None,
            find_usages: false,
        }
    }

    pub fn in_config(mut self, selector: impl Into<String>) -> Self {
        self.config = Some(selector.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_find_usages(mut self, find_usages: bool) -> Self {
        self.find_usages = find_usages;
        self
    }
}

/// Сводка по конфигурации для списка доступных
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub file: String,
    #[serde(rename = "Имя")]
    pub name: String,
    #[serde(rename = "Синоним")]
    pub synonym: String,
    #[serde(rename = "Версия")]
    pub version: String,
    pub objects: usize,
}

pub struct MetadataService {
    settings: ServiceSettings,
    cache: ProjectIndexCache,
    snapshot: ArcSwap<MetadataSnapshot>,
    rebuild_lock: Mutex<()>,
    last_check: Mutex<Instant>,
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService")
            .field("settings", &self.settings)
            .field("configurations", &self.snapshot.load().index().len())
            .finish()
    }
}

impl MetadataService {
    /// Строит начальный снимок (из кэша, если он действителен)
    pub fn open(settings: ServiceSettings) -> Result<Self> {
        settings.validate()?;
        let cache = ProjectIndexCache::new(&settings.dist_dir);
        let snapshot = build_snapshot(&settings.input_dir, &cache)?;

        info!(
            "Metadata service ready: {} configurations from {}",
            snapshot.index().len(),
            settings.input_dir.display()
        );

        Ok(Self {
            settings,
            cache,
            snapshot: ArcSwap::from_pointee(snapshot),
            rebuild_lock: Mutex::new(()),
            last_check: Mutex::new(Instant::now()),
        })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache.cache_file()
    }

    /// Текущий снимок; остаётся согласованным, даже если сервис его заменит
    pub fn snapshot(&self) -> Arc<MetadataSnapshot> {
        self.snapshot.load_full()
    }

    /// Перестраивает снимок, если набор подписей каталога изменился.
    /// `Ok(true)` - опубликован новый снимок; `Ok(false)` - изменений нет
    /// или перестройка уже идёт в другом потоке.
    pub fn refresh(&self) -> Result<bool> {
        self.rebuild_with(false)
    }

    /// Полная перестройка без сравнения подписей
    pub fn rebuild(&self) -> Result<bool> {
        self.rebuild_with(true)
    }

    fn rebuild_with(&self, force: bool) -> Result<bool> {
        let Some(_guard) = self.rebuild_lock.try_lock() else {
            debug!("Rebuild already in progress, serving current snapshot");
            return Ok(false);
        };
        *self.last_check.lock() = Instant::now();

        let current = self.snapshot.load_full();
        let sources = SourceSet::scan(&self.settings.input_dir)?;
        if !force && current.index().is_valid_for(&sources) {
            return Ok(false);
        }

        let changed = sources.changed_since(current.sources());
        info!(
            "Rebuilding metadata snapshot ({} changed files: {:?})",
            changed.len(),
            changed
        );

        let start = Instant::now();
        let next = MetadataSnapshot::from_sources(sources);
        self.cache
            .persist_best_effort(next.index(), &self.settings.input_dir);
        self.snapshot.store(Arc::new(next));

        info!("Snapshot published in {:?}", start.elapsed());
        Ok(true)
    }

    fn refresh_if_due(&self) {
        let due = self.last_check.lock().elapsed() >= self.settings.rescan_interval();
        if !due {
            return;
        }
        if let Err(e) = self.refresh() {
            warn!("Source rescan failed, keeping current snapshot: {:#}", e);
        }
    }

    /// Поиск: проверка аргументов, при необходимости перестройка, выбор
    /// конфигурации и поиск в ней - всё на одном снимке. Тайм-аут запроса
    /// отсчитывается от начала поиска, перестройка в него не входит.
    pub fn search(&self, query: &MetadataQuery) -> Result<SearchResult, SearchError> {
        let request = SearchRequest {
            query: query.query.clone(),
            limit: query.limit.unwrap_or(self.settings.default_limit),
            find_usages: query.find_usages,
            timeout: self.settings.query_timeout(),
        };
        request.validate()?;

        self.refresh_if_due();

        match self.search_in(&self.snapshot(), query, &request) {
            Err(SearchError::Load(LoadError::SourceChanged { file })) => {
                // Файл правили после индексации: перестраиваем и повторяем один раз
                debug!("Source '{}' changed under the snapshot, rebuilding", file);
                if let Err(e) = self.refresh() {
                    warn!("Rebuild after source change failed: {:#}", e);
                }
                self.search_in(&self.snapshot(), query, &request)
            }
            outcome => outcome,
        }
    }

    fn search_in(
        &self,
        snapshot: &MetadataSnapshot,
        query: &MetadataQuery,
        request: &SearchRequest,
    ) -> Result<SearchResult, SearchError> {
        let file_id = match resolve(snapshot.index(), query.config.as_deref()) {
            Resolution::Selected(file_id) => file_id,
            Resolution::Ambiguous {
                selector,
                candidates,
            } => {
                return Ok(SearchResult::Ambiguous {
                    selector,
                    candidates,
                })
            }
            Resolution::NotFound {
                selector,
                available,
            } => {
                return Ok(SearchResult::ConfigNotFound {
                    selector,
                    available,
                })
            }
        };

        let Some(lazy) = snapshot.configuration(&file_id) else {
            // Индекс и деревья одного снимка согласованы; сюда не попадаем
            return Ok(SearchResult::ConfigNotFound {
                selector: query.config.clone(),
                available: self.candidates(snapshot),
            });
        };
        let config = lazy.get()?;

        search::search(request, &config)
    }

    /// Вызов в форме `metadataSearch(query, find_usages, limit, config)`
    pub fn metadata_search(
        &self,
        query: &str,
        find_usages: bool,
        limit: i64,
        config: Option<&str>,
    ) -> Result<SearchResult, SearchError> {
        let mut request = MetadataQuery::new(query)
            .with_limit(limit)
            .with_find_usages(find_usages);
        request.config = config.map(str::to_string);
        self.search(&request)
    }

    /// Загруженные конфигурации по возрастанию идентификатора файла
    pub fn config_summaries(&self) -> Vec<ConfigSummary> {
        self.snapshot()
            .index()
            .entries()
            .map(|entry| ConfigSummary {
                file: entry.file.clone(),
                name: entry.name.clone(),
                synonym: entry.synonym.clone(),
                version: entry.version.clone(),
                objects: entry.total_objects(),
            })
            .collect()
    }

    pub fn load_report(&self) -> LoadReport {
        self.snapshot().report().clone()
    }

    fn candidates(&self, snapshot: &MetadataSnapshot) -> Vec<ConfigCandidate> {
        snapshot.index().entries().map(ConfigCandidate::from).collect()
    }
}
