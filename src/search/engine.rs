//! Поиск объектов метаданных в выбранной конфигурации.
//!
//! Порядок уровней совпадения:
//! 1. точное совпадение канонического полного имени - возвращается одно;
//! 2. совпадение Имени или Синонима (с учётом префикса вида, если он задан);
//! 3. совпадение по началу Имени или Синонима;
//! 4. вхождение подстроки в Имя, Синоним, полное имя или представления.
//!
//! Внутри уровня - порядок объявления в исходном файле.

use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::lookup::SearchableConfiguration;
use crate::configuration::{AttributeDescriptor, AttributeRole, MetadataKind, MetadataObject};
use crate::core::SearchError;
use crate::normalizer::{self, NormalizedQuery};
use crate::resolver::ConfigCandidate;

/// Как часто сканирование проверяет дедлайн
const DEADLINE_CHECK_INTERVAL: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Name,
    Prefix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSummary {
    pub name: String,
    pub synonym: String,
    pub role: AttributeRole,
    pub types: Vec<String>,
}

impl From<&AttributeDescriptor> for AttributeSummary {
    fn from(attribute: &AttributeDescriptor) -> Self {
        Self {
            name: attribute.name.clone(),
            synonym: attribute.synonym.clone(),
            role: attribute.role,
            types: attribute.types.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub synonym: String,
    pub attributes: Vec<AttributeSummary>,
}

/// Структурная сводка найденного объекта
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub full_name: String,
    pub name: String,
    pub synonym: String,
    pub kind: MetadataKind,
    pub tier: MatchTier,
    pub attributes: Vec<AttributeSummary>,
    pub tabular_sections: Vec<SectionSummary>,
}

impl ObjectSummary {
    pub fn new(object: &MetadataObject, tier: MatchTier) -> Self {
        Self {
            full_name: object.full_name.clone(),
            name: object.name.clone(),
            synonym: object.synonym.clone(),
            kind: object.kind,
            tier,
            attributes: object.attributes.iter().map(AttributeSummary::from).collect(),
            tabular_sections: object
                .tabular_sections
                .iter()
                .map(|section| SectionSummary {
                    name: section.name.clone(),
                    synonym: section.synonym.clone(),
                    attributes: section.attributes.iter().map(AttributeSummary::from).collect(),
                })
                .collect(),
        }
    }
}

/// Итог запроса. Ни один из вариантов не является ошибкой.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum SearchResult {
    Matches(Vec<ObjectSummary>),
    Ambiguous {
        selector: Option<String>,
        candidates: Vec<ConfigCandidate>,
    },
    ConfigNotFound {
        selector: Option<String>,
        available: Vec<ConfigCandidate>,
    },
    NoMatch,
}

/// Параметры одного запроса
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: i64,
    /// Зарезервировано: поиск использований не реализован
    pub find_usages: bool,
    /// Отсчитывается от начала обхода конфигурации
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: i64) -> Self {
        Self {
            query: query.into(),
            limit,
            find_usages: false,
            timeout: None,
        }
    }

    /// Проверка аргументов. Лимит не обрезается молча: `limit <= 0` - ошибка.
    pub fn validate(&self) -> Result<(NormalizedQuery, usize), SearchError> {
        if self.limit <= 0 {
            return Err(SearchError::InvalidArgument(format!(
                "limit must be a positive integer, got {}",
                self.limit
            )));
        }
        let limit = usize::try_from(self.limit).map_err(|_| {
            SearchError::InvalidArgument(format!("limit is out of range: {}", self.limit))
        })?;

        let query = normalizer::parse_query(&self.query);
        if query.key.is_empty() {
            return Err(SearchError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }

        if self.find_usages {
            return Err(SearchError::NotImplemented(
                "find_usages is reserved and not implemented yet".to_string(),
            ));
        }

        Ok((query, limit))
    }
}

struct Collector<'a> {
    config: &'a SearchableConfiguration,
    limit: usize,
    seen: HashSet<usize>,
    hits: Vec<ObjectSummary>,
    deadline: Option<Instant>,
    scanned: usize,
}

impl Collector<'_> {
    fn is_full(&self) -> bool {
        self.hits.len() >= self.limit
    }

    fn push(&mut self, ordinal: usize, tier: MatchTier) {
        if !self.is_full() && self.seen.insert(ordinal) {
            self.hits
                .push(ObjectSummary::new(self.config.object(ordinal), tier));
        }
    }

    fn tick(&mut self) -> Result<(), SearchError> {
        self.scanned += 1;
        if self.scanned % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(SearchError::TimedOut);
                }
            }
        }
        Ok(())
    }

    fn scan(
        &mut self,
        kind: Option<MetadataKind>,
        tier: MatchTier,
        matches: impl Fn(&super::lookup::ObjectKeys) -> bool,
    ) -> Result<(), SearchError> {
        let config = self.config;
        for ordinal in config.candidates(kind) {
            if self.is_full() {
                break;
            }
            self.tick()?;
            if !self.seen.contains(&ordinal) && matches(config.keys(ordinal)) {
                self.push(ordinal, tier);
            }
        }
        Ok(())
    }
}

/// Поиск в уже выбранной конфигурации
pub fn search(
    request: &SearchRequest,
    config: &SearchableConfiguration,
) -> Result<SearchResult, SearchError> {
    let (query, limit) = request.validate()?;
    let started = Instant::now();
    let deadline = request.timeout.map(|timeout| started + timeout);

    if deadline.is_some_and(|deadline| started >= deadline) {
        return Err(SearchError::TimedOut);
    }

    if let Some(ordinal) = config.exact(&query.key) {
        tracing::debug!(
            "Exact match for '{}' in '{}'",
            query.canonical,
            config.metadata().file_id
        );
        return Ok(SearchResult::Matches(vec![ObjectSummary::new(
            config.object(ordinal),
            MatchTier::Exact,
        )]));
    }

    let mut collector = Collector {
        config,
        limit,
        seen: HashSet::new(),
        hits: Vec::new(),
        deadline,
        scanned: 0,
    };
    let name_key = query.name_key.as_str();

    if !name_key.is_empty() {
        for &ordinal in config.by_name_key(name_key) {
            if query.kind.map_or(true, |kind| config.object(ordinal).kind == kind) {
                collector.push(ordinal, MatchTier::Name);
            }
        }
    }

    collector.scan(query.kind, MatchTier::Prefix, |keys| {
        keys.name.starts_with(name_key)
            || (!keys.synonym.is_empty() && keys.synonym.starts_with(name_key))
    })?;

    if !name_key.is_empty() {
        let full_key = query.key.as_str();
        collector.scan(query.kind, MatchTier::Substring, |keys| {
            keys.name.contains(name_key)
                || keys.synonym.contains(name_key)
                || keys.full_name.contains(full_key)
                || keys.presentations.iter().any(|p| p.contains(name_key))
        })?;
    }

    tracing::debug!(
        "JSON search took: {:?}. Found {} objects for '{}'",
        started.elapsed(),
        collector.hits.len(),
        query.canonical
    );

    if collector.hits.is_empty() {
        Ok(SearchResult::NoMatch)
    } else {
        Ok(SearchResult::Matches(collector.hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::parse_configuration;
    use pretty_assertions::assert_eq;

    fn catalog() -> SearchableConfiguration {
        let config = parse_configuration(
            "shop",
            r#"{
                "Name": "Shop",
                "Catalogs": [
                    {"Name": "ItemGroups", "Synonym": "Item groups"},
                    {"Name": "Item", "Synonym": "Goods",
                     "Attributes": [{"Name": "Unit", "Synonym": "Unit", "Type": "CatalogRef.Units"}],
                     "TabularSections": [{"Name": "Barcodes", "Attributes": [{"Name": "Code", "Type": "String"}]}]},
                    {"Name": "Units", "Synonym": "Units of measure", "ListPresentation": "Measurement units"}
                ],
                "Documents": [
                    {"Name": "Invoice", "Synonym": "Item invoice"},
                    {"Name": "Order", "Synonym": "Customer order"}
                ]
            }"#,
        )
        .unwrap();
        SearchableConfiguration::new(config)
    }

    fn names(result: &SearchResult) -> Vec<String> {
        match result {
            SearchResult::Matches(hits) => hits.iter().map(|h| h.full_name.clone()).collect(),
            other => panic!("expected matches, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_full_name_is_returned_alone() {
        let result = search(&SearchRequest::new("Catalog.Item", 5), &catalog()).unwrap();
        assert_eq!(names(&result), vec!["Catalog.Item"]);

        let plural = search(&SearchRequest::new("catalogs.item", 5), &catalog()).unwrap();
        assert_eq!(names(&plural), vec!["Catalog.Item"]);
    }

    #[test]
    fn test_summary_describes_shape() {
        let result = search(&SearchRequest::new("CatalogRef.Item", 5), &catalog()).unwrap();
        let SearchResult::Matches(hits) = result else {
            panic!("expected matches");
        };
        let item = &hits[0];
        assert_eq!(item.tier, MatchTier::Exact);
        assert_eq!(item.synonym, "Goods");
        assert_eq!(item.attributes[0].name, "Unit");
        assert_eq!(item.attributes[0].types, vec!["CatalogRef.Units"]);
        assert_eq!(item.tabular_sections[0].name, "Barcodes");
        assert_eq!(item.tabular_sections[0].attributes[0].name, "Code");
    }

    #[test]
    fn test_tiers_rank_name_then_prefix_then_substring() {
        let result = search(&SearchRequest::new("item", 10), &catalog()).unwrap();
        let SearchResult::Matches(hits) = result else {
            panic!("expected matches");
        };
        let ranked: Vec<_> = hits.iter().map(|h| (h.full_name.as_str(), h.tier)).collect();
        assert_eq!(
            ranked,
            vec![
                ("Catalog.Item", MatchTier::Name),
                ("Catalog.ItemGroups", MatchTier::Prefix),
                ("Document.Invoice", MatchTier::Prefix),
            ]
        );
    }

    #[test]
    fn test_kind_prefix_restricts_candidates() {
        let result = search(&SearchRequest::new("Documents.Item", 10), &catalog()).unwrap();
        assert_eq!(names(&result), vec!["Document.Invoice"]);

        let all_documents = search(&SearchRequest::new("Documents", 10), &catalog()).unwrap();
        assert_eq!(names(&all_documents), vec!["Document.Invoice", "Document.Order"]);
    }

    #[test]
    fn test_substring_covers_synonym_and_presentations() {
        let by_synonym = search(&SearchRequest::new("customer", 5), &catalog()).unwrap();
        assert_eq!(names(&by_synonym), vec!["Document.Order"]);

        let by_presentation = search(&SearchRequest::new("measurement", 5), &catalog()).unwrap();
        assert_eq!(names(&by_presentation), vec!["Catalog.Units"]);
    }

    #[test]
    fn test_limit_truncates() {
        let config = catalog();
        for limit in 1..=4 {
            let result = search(&SearchRequest::new("e", limit), &config).unwrap();
            // "e" встречается в 5 объектах
            assert_eq!(names(&result).len(), std::cmp::min(limit as usize, 5));
        }
    }

    #[test]
    fn test_invalid_arguments() {
        let config = catalog();
        for limit in [0, -3] {
            assert!(matches!(
                search(&SearchRequest::new("Item", limit), &config),
                Err(SearchError::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            search(&SearchRequest::new("  . ", 5), &config),
            Err(SearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_find_usages_is_not_implemented() {
        let mut request = SearchRequest::new("Catalog.Item", 5);
        request.find_usages = true;
        assert!(matches!(
            search(&request, &catalog()),
            Err(SearchError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_absent_name_is_no_match() {
        let result = search(&SearchRequest::new("Catalog.Warehouse", 5), &catalog()).unwrap();
        assert_eq!(result, SearchResult::NoMatch);
    }

    #[test]
    fn test_zero_timeout_stops_search() {
        let mut request = SearchRequest::new("item", 5);
        request.timeout = Some(Duration::ZERO);
        assert_eq!(search(&request, &catalog()), Err(SearchError::TimedOut));

        request.timeout = Some(Duration::from_secs(60));
        assert!(search(&request, &catalog()).is_ok());
    }

    #[test]
    fn test_english_full_name_matches_russian_export() {
        let config = SearchableConfiguration::new(
            parse_configuration(
                "erp",
                r#"{"Имя": "ERP", "Справочники": [{"Имя": "ItemGroups"}, {"Имя": "Item"}]}"#,
            )
            .unwrap(),
        );
        for query in ["Catalog.Item", "CatalogRef.Item", "Справочники.Item"] {
            let result = search(&SearchRequest::new(query, 5), &config).unwrap();
            let SearchResult::Matches(hits) = result else {
                panic!("expected matches for {}", query);
            };
            let ranked: Vec<_> = hits.iter().map(|h| (h.full_name.as_str(), h.tier)).collect();
            assert_eq!(ranked, vec![("Справочник.Item", MatchTier::Exact)], "query: {}", query);
        }
    }
}
