//! Кэш индекса конфигураций: производный артефакт, восстанавливаемый из исходников.

use bsl_metadata::unified_index::{CacheDocument, INDEX_FILE_NAME};
use bsl_metadata::{MetadataQuery, MetadataService, SearchResult, ServiceSettings};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn settings(source: &TempDir, dist: &TempDir) -> ServiceSettings {
    ServiceSettings {
        input_dir: source.path().to_path_buf(),
        dist_dir: dist.path().to_path_buf(),
        ..ServiceSettings::default()
    }
}

fn write_sources(source: &TempDir) {
    fs::write(
        source.path().join("erp.json"),
        r#"{"Имя": "ERP", "Синоним": "Предприятие", "Версия": "3.1",
            "Справочники": [{"Имя": "Валюты", "Синоним": "Валюты"}],
            "Документы": [{"Имя": "Счет", "Синоним": "Счет на оплату"}]}"#,
    )
    .unwrap();
    fs::write(source.path().join("broken.json"), "{\"Имя\": \"Broken\",").unwrap();
}

#[test]
fn test_deleting_cache_rebuilds_equal_index() {
    let source = TempDir::new().unwrap();
    let dist = TempDir::new().unwrap();
    write_sources(&source);

    let first = MetadataService::open(settings(&source, &dist)).unwrap();
    let cache_file = first.cache_file();
    assert_eq!(cache_file, dist.path().join(INDEX_FILE_NAME));
    assert!(cache_file.exists());
    let original = first.snapshot().index().clone();
    drop(first);

    fs::remove_file(&cache_file).unwrap();

    let second = MetadataService::open(settings(&source, &dist)).unwrap();
    assert_eq!(second.snapshot().index(), &original);
    assert!(cache_file.exists());
}

#[test]
fn test_cache_document_lists_configs_and_failures() {
    let source = TempDir::new().unwrap();
    let dist = TempDir::new().unwrap();
    write_sources(&source);

    let service = MetadataService::open(settings(&source, &dist)).unwrap();
    let content = fs::read_to_string(service.cache_file()).unwrap();
    let document: CacheDocument = serde_json::from_str(&content).unwrap();

    let files: Vec<_> = document.configs.iter().map(|c| c.file.as_str()).collect();
    assert_eq!(files, vec!["erp"]);
    assert_eq!(document.configs[0].version, "3.1");
    assert_eq!(document.configs[0].total_objects(), 2);
    let failed: Vec<_> = document.failed.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(failed, vec!["broken"]);
}

#[test]
fn test_cached_snapshot_loads_configuration_on_demand() {
    let source = TempDir::new().unwrap();
    let dist = TempDir::new().unwrap();
    write_sources(&source);

    drop(MetadataService::open(settings(&source, &dist)).unwrap());

    let reopened = MetadataService::open(settings(&source, &dist)).unwrap();
    let snapshot = reopened.snapshot();
    assert_eq!(snapshot.loaded_count(), 0);
    assert_eq!(reopened.load_report().failed_files(), vec!["broken"]);

    let result = reopened
        .search(&MetadataQuery::new("Документы.Счет"))
        .unwrap();
    let SearchResult::Matches(hits) = result else {
        panic!("expected matches");
    };
    assert_eq!(hits[0].full_name, "Документ.Счет");
    assert_eq!(snapshot.loaded_count(), 1);
}

#[test]
fn test_corrupt_cache_is_ignored() {
    let source = TempDir::new().unwrap();
    let dist = TempDir::new().unwrap();
    write_sources(&source);
    fs::write(dist.path().join(INDEX_FILE_NAME), "not json at all").unwrap();

    let service = MetadataService::open(settings(&source, &dist)).unwrap();
    assert_eq!(service.snapshot().index().ids(), vec!["erp"]);

    let content = fs::read_to_string(service.cache_file()).unwrap();
    assert!(serde_json::from_str::<CacheDocument>(&content).is_ok());
}
