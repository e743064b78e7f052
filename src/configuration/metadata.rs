//! Типизированная модель метаданных выгруженной конфигурации 1С.
//!
//! Дерево строится один раз при загрузке файла (см. [`super::loader`]) и
//! дальше только читается.

use serde::{Deserialize, Serialize};

/// Вид объекта метаданных
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetadataKind {
    Catalog,
    Document,
    Enum,
    Report,
    DataProcessor,
    ChartOfCharacteristicTypes,
    ChartOfAccounts,
    InformationRegister,
    AccumulationRegister,
    BusinessProcess,
    Task,
    Constant,
    CommonModule,
    Subsystem,
}

/// Язык, на котором записано имя вида в выгрузке
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindLanguage {
    Russian,
    English,
}

/// Единственное и множественное написание вида на одном языке
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindForm {
    pub kind: MetadataKind,
    pub language: KindLanguage,
    pub singular: &'static str,
    pub plural: &'static str,
}

const fn ru(kind: MetadataKind, singular: &'static str, plural: &'static str) -> KindForm {
    KindForm {
        kind,
        language: KindLanguage::Russian,
        singular,
        plural,
    }
}

const fn en(kind: MetadataKind, singular: &'static str, plural: &'static str) -> KindForm {
    KindForm {
        kind,
        language: KindLanguage::English,
        singular,
        plural,
    }
}

/// Фиксированная таблица видов: ключи групп в выгрузке и префиксы полных имён
pub const KIND_FORMS: &[KindForm] = &[
    ru(MetadataKind::Catalog, "Справочник", "Справочники"),
    ru(MetadataKind::Document, "Документ", "Документы"),
    ru(MetadataKind::Enum, "Перечисление", "Перечисления"),
    ru(MetadataKind::Report, "Отчет", "Отчеты"),
    ru(MetadataKind::DataProcessor, "Обработка", "Обработки"),
    ru(
        MetadataKind::ChartOfCharacteristicTypes,
        "ПланВидовХарактеристик",
        "ПланыВидовХарактеристик",
    ),
    ru(MetadataKind::ChartOfAccounts, "ПланСчетов", "ПланыСчетов"),
    ru(MetadataKind::InformationRegister, "РегистрСведений", "РегистрыСведений"),
    ru(MetadataKind::AccumulationRegister, "РегистрНакопления", "РегистрыНакопления"),
    ru(MetadataKind::BusinessProcess, "БизнесПроцесс", "БизнесПроцессы"),
    ru(MetadataKind::Task, "Задача", "Задачи"),
    ru(MetadataKind::Constant, "Константа", "Константы"),
    ru(MetadataKind::CommonModule, "ОбщийМодуль", "ОбщиеМодули"),
    ru(MetadataKind::Subsystem, "Подсистема", "Подсистемы"),
    en(MetadataKind::Catalog, "Catalog", "Catalogs"),
    en(MetadataKind::Document, "Document", "Documents"),
    en(MetadataKind::Enum, "Enum", "Enums"),
    en(MetadataKind::Report, "Report", "Reports"),
    en(MetadataKind::DataProcessor, "DataProcessor", "DataProcessors"),
    en(
        MetadataKind::ChartOfCharacteristicTypes,
        "ChartOfCharacteristicTypes",
        "ChartsOfCharacteristicTypes",
    ),
    en(MetadataKind::ChartOfAccounts, "ChartOfAccounts", "ChartsOfAccounts"),
    en(MetadataKind::InformationRegister, "InformationRegister", "InformationRegisters"),
    en(MetadataKind::AccumulationRegister, "AccumulationRegister", "AccumulationRegisters"),
    en(MetadataKind::BusinessProcess, "BusinessProcess", "BusinessProcesses"),
    en(MetadataKind::Task, "Task", "Tasks"),
    en(MetadataKind::Constant, "Constant", "Constants"),
    en(MetadataKind::CommonModule, "CommonModule", "CommonModules"),
    en(MetadataKind::Subsystem, "Subsystem", "Subsystems"),
];

impl MetadataKind {
    /// Написание вида на заданном языке
    pub fn form(self, language: KindLanguage) -> &'static KindForm {
        KIND_FORMS
            .iter()
            .find(|form| form.kind == self && form.language == language)
            .unwrap_or(&KIND_FORMS[0])
    }
}

impl std::fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.form(KindLanguage::English).singular)
    }
}

/// Роль поля объекта: реквизит, измерение или ресурс регистра
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeRole {
    Attribute,
    Dimension,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub synonym: String,
    pub role: AttributeRole,
    /// Объявленные типы как в выгрузке; составной тип даёт несколько строк
    pub types: Vec<String>,
    /// Канонические полные имена объектов, на которые ссылаются типы
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularSection {
    pub name: String,
    pub synonym: String,
    pub attributes: Vec<AttributeDescriptor>,
}

/// Представления объекта, участвующие только в поиске по подстроке
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPresentations {
    pub object: Option<String>,
    pub extended_object: Option<String>,
    pub list: Option<String>,
    pub extended_list: Option<String>,
}

impl ObjectPresentations {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            &self.object,
            &self.extended_object,
            &self.list,
            &self.extended_list,
        ]
        .into_iter()
        .filter_map(|value| value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataObject {
    pub kind: MetadataKind,
    pub full_name: String,
    pub name: String,
    pub synonym: String,
    #[serde(default)]
    pub presentations: ObjectPresentations,
    pub attributes: Vec<AttributeDescriptor>,
    pub tabular_sections: Vec<TabularSection>,
}

/// Объекты одного вида в порядке объявления
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectGroup {
    pub kind: MetadataKind,
    /// Ключ группы как в исходном файле (`Справочники`, `Catalogs`, ...)
    pub label: String,
    pub objects: Vec<MetadataObject>,
}

/// Одна загруженная конфигурация (один исходный файл)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationMetadata {
    pub file_id: String,
    pub name: String,
    pub synonym: String,
    pub version: String,
    pub groups: Vec<ObjectGroup>,
}

impl ConfigurationMetadata {
    /// Все объекты в порядке объявления: сначала группы, внутри группы объекты
    pub fn objects(&self) -> impl Iterator<Item = &MetadataObject> {
        self.groups.iter().flat_map(|group| group.objects.iter())
    }

    pub fn object_count(&self) -> usize {
        self.groups.iter().map(|group| group.objects.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_both_languages() {
        for form in KIND_FORMS {
            let ru = form.kind.form(KindLanguage::Russian);
            let en = form.kind.form(KindLanguage::English);
            assert_eq!(ru.kind, form.kind);
            assert_eq!(en.kind, form.kind);
            assert_eq!(ru.language, KindLanguage::Russian);
            assert_eq!(en.language, KindLanguage::English);
        }
    }

    #[test]
    fn test_kind_display_uses_english_singular() {
        assert_eq!(MetadataKind::InformationRegister.to_string(), "InformationRegister");
    }
}
