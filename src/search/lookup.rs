//! Вторичные таблицы поиска, строящиеся один раз при загрузке конфигурации.
//!
//! Точное совпадение по полному имени - O(1), совпадение по имени/синониму -
//! короткий список кандидатов; префиксный и подстрочный проходы идут по
//! заранее свёрнутым ключам без повторной нормализации на каждый запрос.

use std::collections::HashMap;

use crate::configuration::{ConfigurationMetadata, MetadataKind, MetadataObject};
use crate::normalizer;

/// Свёрнутые ключи одного объекта
#[derive(Debug, Clone)]
pub struct ObjectKeys {
    pub full_name: String,
    pub name: String,
    pub synonym: String,
    pub presentations: Vec<String>,
}

/// Конфигурация, готовая к поиску: дерево + индексы по порядковым номерам объектов
#[derive(Debug)]
pub struct SearchableConfiguration {
    metadata: ConfigurationMetadata,
    /// (группа, объект) по порядковому номеру в порядке объявления
    positions: Vec<(usize, usize)>,
    keys: Vec<ObjectKeys>,
    by_full_name: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
    by_kind: HashMap<MetadataKind, Vec<usize>>,
}

impl SearchableConfiguration {
    pub fn new(metadata: ConfigurationMetadata) -> Self {
        let mut positions = Vec::with_capacity(metadata.object_count());
        let mut keys = Vec::with_capacity(metadata.object_count());
        let mut by_full_name = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_kind: HashMap<MetadataKind, Vec<usize>> = HashMap::new();

        for (group_index, group) in metadata.groups.iter().enumerate() {
            for (object_index, object) in group.objects.iter().enumerate() {
                let ordinal = positions.len();
                positions.push((group_index, object_index));

                let object_keys = ObjectKeys {
                    full_name: normalizer::lookup_key(&object.full_name),
                    name: normalizer::fold(&object.name),
                    synonym: normalizer::fold(&object.synonym),
                    presentations: object.presentations.iter().map(normalizer::fold).collect(),
                };

                // Первое объявление выигрывает; загрузчик уже отсекает дубликаты
                by_full_name
                    .entry(object_keys.full_name.clone())
                    .or_insert(ordinal);

                for key in [&object_keys.name, &object_keys.synonym] {
                    if key.is_empty() {
                        continue;
                    }
                    let ordinals = by_name.entry(key.clone()).or_default();
                    if ordinals.last() != Some(&ordinal) {
                        ordinals.push(ordinal);
                    }
                }

                by_kind.entry(object.kind).or_default().push(ordinal);
                keys.push(object_keys);
            }
        }

        tracing::debug!(
            "Prepared lookup tables for '{}': {} objects, {} name keys",
            metadata.file_id,
            positions.len(),
            by_name.len()
        );

        Self {
            metadata,
            positions,
            keys,
            by_full_name,
            by_name,
            by_kind,
        }
    }

    pub fn metadata(&self) -> &ConfigurationMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn object(&self, ordinal: usize) -> &MetadataObject {
        let (group, object) = self.positions[ordinal];
        &self.metadata.groups[group].objects[object]
    }

    pub fn keys(&self, ordinal: usize) -> &ObjectKeys {
        &self.keys[ordinal]
    }

    pub fn exact(&self, full_name_key: &str) -> Option<usize> {
        self.by_full_name.get(full_name_key).copied()
    }

    /// Объекты, у которых Имя или Синоним совпадает с ключом, по возрастанию порядка
    pub fn by_name_key(&self, key: &str) -> &[usize] {
        self.by_name.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Порядковые номера кандидатов: все объекты или только заданного вида
    pub fn candidates(&self, kind: Option<MetadataKind>) -> Box<dyn Iterator<Item = usize> + '_> {
        match kind {
            Some(kind) => Box::new(
                self.by_kind
                    .get(&kind)
                    .into_iter()
                    .flat_map(|ordinals| ordinals.iter().copied()),
            ),
            None => Box::new(0..self.positions.len()),
        }
    }
}
