//! Загрузка JSON-выгрузок метаданных в типизированную модель.
//!
//! Схема проверяется один раз на входе: отсутствующее обязательное поле,
//! неверная форма раздела или повтор полного имени превращаются в
//! [`LoadError`] для своего файла. Остальные файлы загружаются независимо.

use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::metadata::{
    AttributeDescriptor, AttributeRole, ConfigurationMetadata, MetadataKind, MetadataObject,
    ObjectGroup, ObjectPresentations, TabularSection,
};
use crate::core::{read_metadata_file, LoadError, LoadReport};
use crate::normalizer;
use crate::unified_index::configuration_watcher::{SourceFile, SourceSet};

/// Результат загрузки каталога
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub sources: SourceSet,
    pub configurations: BTreeMap<String, ConfigurationMetadata>,
    pub report: LoadReport,
}

/// Загружает все выгрузки каталога. Ошибка возвращается только если сам
/// каталог не удалось прочитать; сбои отдельных файлов попадают в отчёт.
pub fn load_directory(source_dir: &Path) -> anyhow::Result<LoadOutcome> {
    let sources = SourceSet::scan(source_dir)?;
    Ok(load_sources(sources))
}

/// Параллельный разбор уже найденных файлов
pub fn load_sources(sources: SourceSet) -> LoadOutcome {
    let files: Vec<&SourceFile> = sources.files().collect();
    let results: Vec<(String, Result<ConfigurationMetadata, LoadError>)> = files
        .par_iter()
        .map(|source| (source.file_id.clone(), load_file(source)))
        .collect();

    let mut configurations = BTreeMap::new();
    let mut report = LoadReport::new();

    // par_iter сохраняет порядок, а SourceSet отсортирован по идентификатору
    for (file_id, result) in results {
        match result {
            Ok(configuration) => {
                report.record_loaded(file_id.clone());
                configurations.insert(file_id, configuration);
            }
            Err(error) => {
                tracing::warn!("Skipping metadata file: {}", error);
                report.record_failure(error);
            }
        }
    }

    tracing::info!(
        "Loaded {} configurations, {} failed",
        report.loaded.len(),
        report.failed.len()
    );

    LoadOutcome {
        sources,
        configurations,
        report,
    }
}

pub fn load_file(source: &SourceFile) -> Result<ConfigurationMetadata, LoadError> {
    let text = read_metadata_file(&source.path).map_err(|e| LoadError::Io {
        file: source.file_id.clone(),
        message: e.to_string(),
    })?;
    parse_configuration(&source.file_id, &text)
}

#[derive(Deserialize)]
struct RawConfiguration {
    #[serde(rename = "Имя", alias = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Синоним", alias = "Synonym", default)]
    synonym: Option<String>,
    #[serde(rename = "Версия", alias = "Version", default)]
    version: Option<String>,
    #[serde(flatten)]
    sections: serde_json::Map<String, Value>,
}

#[derive(Deserialize)]
struct RawObject {
    #[serde(rename = "Имя", alias = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Синоним", alias = "Synonym", default)]
    synonym: Option<String>,
    #[serde(rename = "ПолноеИмя", alias = "FullName", default)]
    full_name: Option<String>,
    #[serde(rename = "ПредставлениеОбъекта", alias = "ObjectPresentation", default)]
    object_presentation: Option<String>,
    #[serde(
        rename = "РасширенноеПредставлениеОбъекта",
        alias = "ExtendedObjectPresentation",
        default
    )]
    extended_object_presentation: Option<String>,
    #[serde(rename = "ПредставлениеСписка", alias = "ListPresentation", default)]
    list_presentation: Option<String>,
    #[serde(
        rename = "РасширенноеПредставлениеСписка",
        alias = "ExtendedListPresentation",
        default
    )]
    extended_list_presentation: Option<String>,
    #[serde(rename = "Реквизиты", alias = "Attributes", default)]
    attributes: Option<Vec<RawAttribute>>,
    #[serde(rename = "Измерения", alias = "Dimensions", default)]
    dimensions: Option<Vec<RawAttribute>>,
    #[serde(rename = "Ресурсы", alias = "Resources", default)]
    resources: Option<Vec<RawAttribute>>,
    #[serde(rename = "ТабличныеЧасти", alias = "TabularSections", default)]
    tabular_sections: Option<Vec<RawTabularSection>>,
}

#[derive(Deserialize)]
struct RawTabularSection {
    #[serde(rename = "Имя", alias = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Синоним", alias = "Synonym", default)]
    synonym: Option<String>,
    #[serde(rename = "Реквизиты", alias = "Attributes", default)]
    attributes: Option<Vec<RawAttribute>>,
}

#[derive(Deserialize)]
struct RawAttribute {
    #[serde(rename = "Имя", alias = "Name", default)]
    name: Option<String>,
    #[serde(rename = "Синоним", alias = "Synonym", default)]
    synonym: Option<String>,
    #[serde(rename = "Тип", alias = "Type", default)]
    type_decl: Option<TypeDecl>,
}

/// Тип реквизита: одиночный или составной
#[derive(Deserialize)]
#[serde(untagged)]
enum TypeDecl {
    Single(String),
    Composite(Vec<String>),
}

impl TypeDecl {
    fn into_types(self) -> Vec<String> {
        match self {
            TypeDecl::Single(name) => vec![name],
            TypeDecl::Composite(names) => names,
        }
    }
}

/// Проход проверки схемы для одного файла
struct SchemaCheck<'a> {
    file: &'a str,
}

impl SchemaCheck<'_> {
    fn required(
        &self,
        value: Option<String>,
        field: impl FnOnce() -> String,
    ) -> Result<String, LoadError> {
        match value {
            Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(LoadError::MissingField {
                file: self.file.to_string(),
                field: field(),
            }),
        }
    }

    fn attributes(
        &self,
        raw: Option<Vec<RawAttribute>>,
        role: AttributeRole,
        path: &str,
        collection: &str,
        into: &mut Vec<AttributeDescriptor>,
    ) -> Result<(), LoadError> {
        for (index, attribute) in raw.unwrap_or_default().into_iter().enumerate() {
            let name = self.required(attribute.name, || {
                format!("{}.{}[{}].Имя", path, collection, index)
            })?;
            let types = attribute
                .type_decl
                .map(TypeDecl::into_types)
                .unwrap_or_default();
            let references = types
                .iter()
                .filter_map(|type_name| normalizer::reference_target(type_name))
                .collect();
            into.push(AttributeDescriptor {
                name,
                synonym: attribute.synonym.unwrap_or_default(),
                role,
                types,
                references,
            });
        }
        Ok(())
    }

    fn object(
        &self,
        raw: RawObject,
        group_label: &str,
        singular: &str,
        index: usize,
        kind: MetadataKind,
    ) -> Result<MetadataObject, LoadError> {
        let path = format!("{}[{}]", group_label, index);
        let name = self.required(raw.name, || format!("{}.Имя", path))?;
        let full_name = raw
            .full_name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| format!("{}.{}", singular, name));

        let mut attributes = Vec::new();
        self.attributes(raw.attributes, AttributeRole::Attribute, &path, "Реквизиты", &mut attributes)?;
        self.attributes(raw.dimensions, AttributeRole::Dimension, &path, "Измерения", &mut attributes)?;
        self.attributes(raw.resources, AttributeRole::Resource, &path, "Ресурсы", &mut attributes)?;

        let mut tabular_sections = Vec::new();
        for (ts_index, section) in raw.tabular_sections.unwrap_or_default().into_iter().enumerate() {
            let section_path = format!("{}.ТабличныеЧасти[{}]", path, ts_index);
            let section_name = self.required(section.name, || format!("{}.Имя", section_path))?;
            let mut section_attributes = Vec::new();
            self.attributes(
                section.attributes,
                AttributeRole::Attribute,
                &section_path,
                "Реквизиты",
                &mut section_attributes,
            )?;
            tabular_sections.push(TabularSection {
                name: section_name,
                synonym: section.synonym.unwrap_or_default(),
                attributes: section_attributes,
            });
        }

        Ok(MetadataObject {
            kind,
            full_name,
            name,
            synonym: raw.synonym.unwrap_or_default(),
            presentations: ObjectPresentations {
                object: raw.object_presentation,
                extended_object: raw.extended_object_presentation,
                list: raw.list_presentation,
                extended_list: raw.extended_list_presentation,
            },
            attributes,
            tabular_sections,
        })
    }
}

/// Разбор текста одной выгрузки
pub fn parse_configuration(file_id: &str, text: &str) -> Result<ConfigurationMetadata, LoadError> {
    let value: Value = serde_json::from_str(text).map_err(|e| LoadError::Parse {
        file: file_id.to_string(),
        message: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(LoadError::NotAnObject {
            file: file_id.to_string(),
        });
    }
    let raw: RawConfiguration = serde_json::from_value(value).map_err(|e| LoadError::Parse {
        file: file_id.to_string(),
        message: e.to_string(),
    })?;

    let check = SchemaCheck { file: file_id };
    let name = check.required(raw.name, || "Имя".to_string())?;

    let mut groups = Vec::new();
    let mut seen_full_names = HashSet::new();

    for (label, section) in raw.sections {
        // Неизвестные ключи верхнего уровня допустимы
        let Some(form) = normalizer::group_kind(&label) else {
            continue;
        };
        let objects: Vec<RawObject> = match section {
            Value::Null => Vec::new(),
            Value::Array(_) => serde_json::from_value(section).map_err(|e| LoadError::InvalidSection {
                file: file_id.to_string(),
                section: label.clone(),
                message: e.to_string(),
            })?,
            other => {
                return Err(LoadError::InvalidSection {
                    file: file_id.to_string(),
                    section: label.clone(),
                    message: format!("expected an array of objects, found {}", json_type_name(&other)),
                })
            }
        };

        let mut group = ObjectGroup {
            kind: form.kind,
            label: label.clone(),
            objects: Vec::with_capacity(objects.len()),
        };
        for (index, raw_object) in objects.into_iter().enumerate() {
            let object = check.object(raw_object, &label, form.singular, index, form.kind)?;
            if !seen_full_names.insert(normalizer::lookup_key(&object.full_name)) {
                return Err(LoadError::DuplicateObject {
                    file: file_id.to_string(),
                    full_name: object.full_name,
                });
            }
            group.objects.push(object);
        }
        groups.push(group);
    }

    Ok(ConfigurationMetadata {
        file_id: file_id.to_string(),
        name,
        synonym: raw.synonym.unwrap_or_default(),
        version: raw.version.unwrap_or_default(),
        groups,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const TRADE: &str = r#"{
        "Имя": "УправлениеТорговлей",
        "Синоним": "Управление торговлей",
        "Версия": "11.5.1",
        "Документы": [
            {
                "Имя": "Счет",
                "Синоним": "Счет на оплату",
                "Реквизиты": [
                    {"Имя": "Контрагент", "Синоним": "Контрагент", "Тип": "СправочникСсылка.Контрагенты"},
                    {"Имя": "Основание", "Тип": ["ДокументСсылка.Заказ", "Строка"]}
                ],
                "ТабличныеЧасти": [
                    {"Имя": "Товары", "Синоним": "Товары", "Реквизиты": [{"Имя": "Количество", "Тип": "Число"}]}
                ],
                "Модули": {"ignored": true}
            }
        ],
        "Справочники": [
            {"Имя": "Контрагенты", "ПолноеИмя": "Справочник.Контрагенты"}
        ],
        "Роли": [{"Имя": "Администратор"}],
        "ДатаВыгрузки": "2024-01-01"
    }"#;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let config = parse_configuration("ut", TRADE).unwrap();
        assert_eq!(config.name, "УправлениеТорговлей");
        assert_eq!(config.version, "11.5.1");

        let kinds: Vec<_> = config.groups.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![MetadataKind::Document, MetadataKind::Catalog]);
        assert_eq!(config.groups[0].label, "Документы");

        let invoice = &config.groups[0].objects[0];
        assert_eq!(invoice.full_name, "Документ.Счет");
        assert_eq!(invoice.attributes.len(), 2);
        assert_eq!(invoice.attributes[0].references, vec!["Справочник.Контрагенты"]);
        assert_eq!(invoice.attributes[1].types, vec!["ДокументСсылка.Заказ", "Строка"]);
        assert_eq!(invoice.attributes[1].synonym, "");
        assert_eq!(invoice.tabular_sections[0].attributes[0].name, "Количество");
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let config = parse_configuration("x", r#"{"Name": "X", "Catalogs": [{"Name": "Item"}]}"#).unwrap();
        let item = &config.groups[0].objects[0];
        assert_eq!(item.full_name, "Catalog.Item");
        assert!(item.attributes.is_empty());
        assert!(item.tabular_sections.is_empty());
        assert_eq!(config.synonym, "");
    }

    #[test]
    fn test_bom_and_register_fields() {
        let text = "\u{FEFF}{\"Имя\": \"Б\", \"РегистрыСведений\": [{\"Имя\": \"КурсыВалют\", \"Измерения\": [{\"Имя\": \"Валюта\"}], \"Ресурсы\": [{\"Имя\": \"Курс\"}]}]}";
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.json"), text).unwrap();

        let outcome = load_directory(temp_dir.path()).unwrap();
        assert!(outcome.report.is_clean());
        let register = &outcome.configurations["b"].groups[0].objects[0];
        let roles: Vec<_> = register.attributes.iter().map(|a| a.role).collect();
        assert_eq!(roles, vec![AttributeRole::Dimension, AttributeRole::Resource]);
    }

    #[test]
    fn test_schema_violations_are_typed() {
        assert!(matches!(
            parse_configuration("a", "[1, 2]"),
            Err(LoadError::NotAnObject { .. })
        ));
        assert!(matches!(
            parse_configuration("a", "{not json"),
            Err(LoadError::Parse { .. })
        ));
        assert_eq!(
            parse_configuration("a", r#"{"Синоним": "без имени"}"#).unwrap_err(),
            LoadError::MissingField {
                file: "a".to_string(),
                field: "Имя".to_string()
            }
        );
        assert_eq!(
            parse_configuration("a", r#"{"Имя": "A", "Справочники": [{"Синоним": "?"}]}"#).unwrap_err(),
            LoadError::MissingField {
                file: "a".to_string(),
                field: "Справочники[0].Имя".to_string()
            }
        );
        assert!(matches!(
            parse_configuration("a", r#"{"Имя": "A", "Справочники": {"Имя": "X"}}"#),
            Err(LoadError::InvalidSection { .. })
        ));
        assert!(matches!(
            parse_configuration(
                "a",
                r#"{"Имя": "A", "Справочники": [{"Имя": "X"}, {"Имя": "x", "ПолноеИмя": "справочник.X"}]}"#
            ),
            Err(LoadError::DuplicateObject { .. })
        ));
    }

    #[test]
    fn test_bad_file_does_not_abort_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("good.json"), TRADE).unwrap();
        fs::write(temp_dir.path().join("bad.json"), "{\"Имя\": ").unwrap();

        let outcome = load_directory(temp_dir.path()).unwrap();
        assert_eq!(outcome.report.loaded, vec!["good"]);
        assert_eq!(outcome.report.failed_files(), vec!["bad"]);
        assert!(outcome.configurations.contains_key("good"));
        assert!(!outcome.configurations.contains_key("bad"));
    }
}
