/*!
Test for BOM handling in metadata exports
*/

use bsl_metadata::core::read_metadata_file;
use bsl_metadata::load_directory;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_file_reading_with_bom() -> std::io::Result<()> {
    // Create file with UTF-8 BOM bytes (EF BB BF)
    let mut temp_file = NamedTempFile::new()?;
    let mut content = vec![0xEF, 0xBB, 0xBF];
    content.extend_from_slice("{\"Имя\": \"Бухгалтерия\"}".as_bytes());
    temp_file.write_all(&content)?;

    let content = read_metadata_file(temp_file.path())?;
    assert!(!content.starts_with('\u{FEFF}'));
    assert!(content.starts_with('{'));
    Ok(())
}

#[test]
fn test_file_without_bom_is_unchanged() -> std::io::Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all("{\"Имя\": \"УТ\"}".as_bytes())?;

    let content = read_metadata_file(temp_file.path())?;
    assert_eq!(content, "{\"Имя\": \"УТ\"}");
    Ok(())
}

#[test]
fn test_bom_export_loads() -> std::io::Result<()> {
    let temp_dir = TempDir::new()?;
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(
        "{\"Имя\": \"Бухгалтерия\", \"Справочники\": [{\"Имя\": \"Контрагенты\"}]}".as_bytes(),
    );
    std::fs::write(temp_dir.path().join("bp.json"), bytes)?;

    let outcome = load_directory(temp_dir.path()).expect("directory is readable");
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.configurations["bp"].name, "Бухгалтерия");
    Ok(())
}
