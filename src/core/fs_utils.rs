//! File system utility helpers (BOM-aware readers, signatures, etc.)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Read a metadata export as UTF-8 text, stripping UTF-8 BOM if present.
///
/// The 1C exporter writes `utf-8-sig`, so the BOM is the common case.
pub fn read_metadata_file(path: &Path) -> std::io::Result<String> {
    let mut content = fs::read_to_string(path)?;
    if content.starts_with('\u{FEFF}') {
        content = content.trim_start_matches('\u{FEFF}').to_string();
    }
    Ok(content)
}

/// Подпись исходного файла: время модификации и размер.
///
/// Дешевле хеша содержимого и достаточна для проверки актуальности кэша.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSignature {
    pub modified: DateTime<Utc>,
    pub size: u64,
}

impl SourceSignature {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            modified: DateTime::<Utc>::from(metadata.modified()?),
            size: metadata.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_signature_tracks_size() -> std::io::Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"{}")?;
        let before = SourceSignature::of(file.path())?;
        assert_eq!(before.size, 2);

        file.write_all(b"  ")?;
        file.flush()?;
        let after = SourceSignature::of(file.path())?;
        assert_eq!(after.size, 4);
        assert_ne!(before, after);
        Ok(())
    }
}
