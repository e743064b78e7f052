use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::configuration_watcher::SourceSet;
use crate::configuration::{ConfigurationMetadata, LoadOutcome, MetadataKind};
use crate::core::{LoadError, LoadReport, SourceSignature};

/// Число объектов в одной группе выгрузки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCount {
    pub kind: MetadataKind,
    /// Ключ группы как в исходном файле
    pub group: String,
    pub count: usize,
}

/// Краткая сводка по одной конфигурации
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigIndexEntry {
    pub file: String,
    #[serde(rename = "Имя")]
    pub name: String,
    #[serde(rename = "Синоним", default)]
    pub synonym: String,
    #[serde(rename = "Версия", default)]
    pub version: String,
    /// В порядке объявления групп
    pub object_counts: Vec<KindCount>,
    pub signature: SourceSignature,
}

impl ConfigIndexEntry {
    pub fn from_metadata(config: &ConfigurationMetadata, signature: SourceSignature) -> Self {
        Self {
            file: config.file_id.clone(),
            name: config.name.clone(),
            synonym: config.synonym.clone(),
            version: config.version.clone(),
            object_counts: config
                .groups
                .iter()
                .map(|group| KindCount {
                    kind: group.kind,
                    group: group.label.clone(),
                    count: group.objects.len(),
                })
                .collect(),
            signature,
        }
    }

    pub fn total_objects(&self) -> usize {
        self.object_counts.iter().map(|c| c.count).sum()
    }
}

/// Файл, не прошедший загрузку. Хранится в индексе вместе с подписью,
/// чтобы набор подписей кэша покрывал весь каталог.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSource {
    pub file: String,
    pub signature: SourceSignature,
    pub error: LoadError,
}

/// Производный индекс конфигураций: полностью восстанавливается из исходников
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigIndex {
    entries: BTreeMap<String, ConfigIndexEntry>,
    failed: BTreeMap<String, FailedSource>,
}

impl ConfigIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Строит индекс по результату загрузки. Детерминирован для одного и того же
    /// набора исходников: конфигурации упорядочены по идентификатору файла,
    /// группы внутри записи - по порядку объявления.
    pub fn build(outcome: &LoadOutcome) -> Self {
        let mut index = Self::new();

        for (file_id, config) in &outcome.configurations {
            let Some(source) = outcome.sources.get(file_id) else {
                continue;
            };
            index.entries.insert(
                file_id.clone(),
                ConfigIndexEntry::from_metadata(config, source.signature),
            );
        }

        for error in &outcome.report.failed {
            if let Some(source) = outcome.sources.get(error.file()) {
                index.failed.insert(
                    source.file_id.clone(),
                    FailedSource {
                        file: source.file_id.clone(),
                        signature: source.signature,
                        error: error.clone(),
                    },
                );
            }
        }

        debug!(
            "Built config index: {} entries, {} failed sources",
            index.entries.len(),
            index.failed.len()
        );

        index
    }

    pub fn from_parts(
        entries: impl IntoIterator<Item = ConfigIndexEntry>,
        failed: impl IntoIterator<Item = FailedSource>,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.file.clone(), entry))
                .collect(),
            failed: failed
                .into_iter()
                .map(|source| (source.file.clone(), source))
                .collect(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConfigIndexEntry> {
        self.entries.values()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FailedSource> {
        self.failed.values()
    }

    pub fn get(&self, file_id: &str) -> Option<&ConfigIndexEntry> {
        self.entries.get(file_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Подписи всех файлов, учтённых индексом, включая отброшенные
    pub fn signatures(&self) -> BTreeMap<String, SourceSignature> {
        self.entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.signature))
            .chain(
                self.failed
                    .iter()
                    .map(|(id, source)| (id.clone(), source.signature)),
            )
            .collect()
    }

    /// Кэш годится только при точном совпадении наборов подписей
    pub fn is_valid_for(&self, sources: &SourceSet) -> bool {
        self.signatures() == sources.signatures()
    }

    pub fn load_report(&self) -> LoadReport {
        LoadReport {
            loaded: self.ids(),
            failed: self.failed.values().map(|f| f.error.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::load_directory;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("erp.json"),
            r#"{"Имя": "ERP", "Синоним": "Предприятие", "Версия": "2.5",
                "Документы": [{"Имя": "Счет"}, {"Имя": "Заказ"}],
                "Справочники": [{"Имя": "Валюты"}]}"#,
        )
        .unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{").unwrap();
        temp_dir
    }

    #[test]
    fn test_build_counts_groups_in_declaration_order() {
        let temp_dir = fixture();
        let outcome = load_directory(temp_dir.path()).unwrap();
        let index = ConfigIndex::build(&outcome);

        let entry = index.get("erp").unwrap();
        assert_eq!(entry.name, "ERP");
        assert_eq!(entry.version, "2.5");
        let counts: Vec<_> = entry
            .object_counts
            .iter()
            .map(|c| (c.kind, c.count))
            .collect();
        assert_eq!(
            counts,
            vec![(MetadataKind::Document, 2), (MetadataKind::Catalog, 1)]
        );
        assert_eq!(entry.total_objects(), 3);
        assert_eq!(index.failed().map(|f| f.file.as_str()).collect::<Vec<_>>(), vec!["broken"]);
    }

    #[test]
    fn test_build_is_deterministic_and_covers_all_signatures() {
        let temp_dir = fixture();
        let first = ConfigIndex::build(&load_directory(temp_dir.path()).unwrap());
        let second = ConfigIndex::build(&load_directory(temp_dir.path()).unwrap());
        assert_eq!(first, second);

        let sources = SourceSet::scan(temp_dir.path()).unwrap();
        assert!(first.is_valid_for(&sources));

        fs::write(temp_dir.path().join("new.json"), r#"{"Имя": "N"}"#).unwrap();
        let sources = SourceSet::scan(temp_dir.path()).unwrap();
        assert!(!first.is_valid_for(&sources));
    }

    #[test]
    fn test_load_report_from_index() {
        let temp_dir = fixture();
        let index = ConfigIndex::build(&load_directory(temp_dir.path()).unwrap());
        let report = index.load_report();
        assert_eq!(report.loaded, vec!["erp"]);
        assert_eq!(report.failed_files(), vec!["broken"]);
    }
}
