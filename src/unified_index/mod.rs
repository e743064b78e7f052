/*!
# Unified Config Index

Сканирование каталога выгрузок, производный индекс конфигураций, его кэш
на диске и неизменяемые снимки, которые публикует сервис.
*/

pub mod configuration_watcher;
pub mod index;
pub mod project_cache;
pub mod snapshot;

pub use configuration_watcher::{SourceFile, SourceSet, INDEX_FILE_NAME};
pub use index::{ConfigIndex, ConfigIndexEntry, FailedSource, KindCount};
pub use project_cache::{CacheDocument, ProjectIndexCache, CACHE_FORMAT_VERSION};
pub use snapshot::{build_snapshot, LazyConfiguration, MetadataSnapshot};
