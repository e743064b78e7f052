/*!
# Search Engine

Поиск объектов метаданных внутри одной выбранной конфигурации.
*/

pub mod engine;
pub mod lookup;

pub use engine::{
    search, AttributeSummary, MatchTier, ObjectSummary, SearchRequest, SearchResult,
    SectionSummary,
};
pub use lookup::{ObjectKeys, SearchableConfiguration};
