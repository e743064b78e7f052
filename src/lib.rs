/*!
# BSL Metadata Search v1.0

Поиск по выгрузкам метаданных конфигураций 1С:Предприятие: справочники,
документы, регистры, перечисления и их реквизиты по полному имени, имени
или синониму, с учётом множественного числа и ссылочных типов.

## Core Features

- **Metadata loading** - JSON-выгрузки по одной на конфигурацию, ошибки изолированы по файлам
- **Type normalization** - `Документы.Счет`, `ДокументСсылка.Счет` и `Document.Счет` дают одно каноническое имя
- **Config index** - производный кэш в каталоге dist, сверяется по подписям исходников
- **Config resolver** - выбор конфигурации по имени файла, Имени или Синониму без молчаливых догадок
- **Tiered search** - точное имя, затем имя/синоним, начало и вхождение подстроки
- **Snapshots** - запросы читают неизменяемый снимок, перестройка подменяет его атомарно

## Architecture

```text
BSL Metadata Search
├── Configuration   - типизированная модель и загрузчик JSON-выгрузок
├── Normalizer      - каноническая форма имён и запросов
├── Unified Index   - сканирование исходников, индекс, кэш, снимки
├── Resolver        - выбор конфигурации по селектору
├── Search          - таблицы поиска и ранжирование
├── Service         - контекст сервиса: снимок и перестройка
└── MCP Server      - инструменты metadatasearch / list_configurations
```

## Usage

### CLI
```bash
bsl-metadata --input-dir ./metadata_src search "Справочники.Номенклатура"
bsl-metadata search "Счет" --config erp --limit 10 --format json
bsl-metadata configs
bsl-metadata index --force
```

### Library
```rust,no_run
use bsl_metadata::{MetadataQuery, MetadataService, SearchResult, ServiceSettings};

# fn main() -> anyhow::Result<()> {
let service = MetadataService::open(ServiceSettings::from_env()?)?;
let result = service.search(&MetadataQuery::new("Документы.Счет").in_config("erp"))?;
if let SearchResult::Matches(objects) = result {
    for object in objects {
        println!("{} ({})", object.full_name, object.synonym);
    }
}
# Ok(())
# }
```
*/

pub mod cli_common;
pub mod configuration;
pub mod core;
pub mod mcp_server;
pub mod normalizer;
pub mod resolver;
pub mod search;
pub mod service;
pub mod settings;
pub mod unified_index;

pub use configuration::{
    load_directory, AttributeDescriptor, ConfigurationMetadata, LoadOutcome, MetadataKind,
    MetadataObject,
};
pub use core::{CacheError, LoadError, LoadReport, SearchError};
pub use normalizer::{canonicalize, lookup_key, parse_query, NormalizedQuery};
pub use resolver::{resolve, ConfigCandidate, Resolution};
pub use search::{MatchTier, ObjectSummary, SearchRequest, SearchResult, SearchableConfiguration};
pub use service::{ConfigSummary, MetadataQuery, MetadataService};
pub use settings::ServiceSettings;
pub use unified_index::{
    build_snapshot, ConfigIndex, ConfigIndexEntry, MetadataSnapshot, ProjectIndexCache,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
