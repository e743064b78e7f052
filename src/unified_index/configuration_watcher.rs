/*!
# Source Directory Tracking

Обнаружение JSON-выгрузок в каталоге исходных данных и их подписи
(время модификации + размер). Набор подписей определяет актуальность
кэша индекса и необходимость перестройки снимка.
*/

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::SourceSignature;

/// Имя файла кэша индекса. Игнорируется, даже если лежит в каталоге исходников.
pub const INDEX_FILE_NAME: &str = "metadata_configs_index.json";

/// Один найденный файл выгрузки
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Имя файла без расширения
    pub file_id: String,
    pub file_name: String,
    pub path: PathBuf,
    pub signature: SourceSignature,
}

/// Все выгрузки каталога, упорядоченные по идентификатору файла
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    files: BTreeMap<String, SourceFile>,
}

impl SourceSet {
    /// Сканирование каталога (без рекурсии).
    ///
    /// Отсутствующий каталог даёт пустой набор: сервис продолжает работать
    /// и сообщает, что конфигурации не найдены.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut set = Self::default();

        if !root.exists() {
            tracing::warn!("Metadata source directory does not exist: {}", root.display());
            return Ok(set);
        }

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to list metadata directory {}", root.display()))?;
            // Ссылки разыменовываются, битые пропускаются
            if !entry.path().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(file_id) = Self::file_id_for(&file_name) else {
                continue;
            };

            if set.files.contains_key(&file_id) {
                tracing::warn!(
                    "Duplicate configuration id '{}': {} ignored",
                    file_id,
                    file_name
                );
                continue;
            }

            let path = entry.path().to_path_buf();
            match SourceSignature::of(&path) {
                Ok(signature) => {
                    set.files.insert(
                        file_id.clone(),
                        SourceFile {
                            file_id,
                            file_name,
                            path,
                            signature,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", path.display(), e);
                }
            }
        }

        tracing::debug!(
            "Scanned {} metadata files in {}",
            set.files.len(),
            root.display()
        );

        Ok(set)
    }

    /// Идентификатор для подходящего файла: `*.json`, не скрытый и не кэш индекса
    fn file_id_for(file_name: &str) -> Option<String> {
        if file_name.starts_with('.') || file_name.eq_ignore_ascii_case(INDEX_FILE_NAME) {
            return None;
        }
        let path = Path::new(file_name);
        let extension = path.extension()?.to_str()?;
        if !extension.eq_ignore_ascii_case("json") {
            return None;
        }
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn get(&self, file_id: &str) -> Option<&SourceFile> {
        self.files.get(file_id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Набор подписей для сравнения с кэшем
    pub fn signatures(&self) -> BTreeMap<String, SourceSignature> {
        self.files
            .iter()
            .map(|(id, file)| (id.clone(), file.signature))
            .collect()
    }

    /// Идентификаторы добавленных, удалённых и изменённых файлов относительно `previous`
    pub fn changed_since(&self, previous: &SourceSet) -> Vec<String> {
        let mut changed = Vec::new();

        for (id, file) in &self.files {
            match previous.files.get(id) {
                Some(old) if old.signature == file.signature && old.path == file.path => {}
                Some(_) => {
                    tracing::debug!("File changed: {}", file.path.display());
                    changed.push(id.clone());
                }
                None => {
                    tracing::debug!("New file detected: {}", file.path.display());
                    changed.push(id.clone());
                }
            }
        }

        for (id, old) in &previous.files {
            if !self.files.contains_key(id) {
                tracing::debug!("File deleted: {}", old.path.display());
                changed.push(id.clone());
            }
        }

        changed.sort();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_filters_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("upp.json"), "{}").unwrap();
        fs::write(root.join("ut.JSON"), "{}").unwrap();
        fs::write(root.join(".hidden.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "x").unwrap();
        fs::write(root.join(INDEX_FILE_NAME), "{}").unwrap();
        fs::create_dir(root.join("nested.json")).unwrap();

        let set = SourceSet::scan(root).unwrap();
        let ids: Vec<_> = set.files().map(|f| f.file_id.as_str()).collect();
        assert_eq!(ids, vec!["upp", "ut"]);
        assert_eq!(set.get("ut").unwrap().file_name, "ut.JSON");
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let exports = TempDir::new().unwrap();
        let target = exports.path().join("erp-2024.json");
        fs::write(&target, "{\"Имя\": \"ERP\"}").unwrap();

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        symlink(&target, root.join("erp.json")).unwrap();
        symlink(exports.path().join("absent.json"), root.join("dangling.json")).unwrap();

        let set = SourceSet::scan(root).unwrap();
        let ids: Vec<_> = set.files().map(|f| f.file_id.as_str()).collect();
        assert_eq!(ids, vec!["erp"]);

        let linked = set.get("erp").unwrap();
        assert_eq!(linked.path, root.join("erp.json"));
        assert_eq!(linked.signature, SourceSignature::of(&target).unwrap());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let set = SourceSet::scan(&temp_dir.path().join("absent")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_changed_since_reports_added_and_removed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.json"), "{}").unwrap();
        fs::write(root.join("b.json"), "{}").unwrap();
        let before = SourceSet::scan(root).unwrap();

        fs::remove_file(root.join("a.json")).unwrap();
        fs::write(root.join("c.json"), "{}").unwrap();
        fs::write(root.join("b.json"), "{ }").unwrap();
        let after = SourceSet::scan(root).unwrap();

        assert_eq!(after.changed_since(&before), vec!["a", "b", "c"]);
        assert!(after.changed_since(&after).is_empty());
    }
}
