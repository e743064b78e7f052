/*!
# Type Normalizer

Приведение имён объектов и строк запроса к канонической форме:

- вид во множественном числе заменяется единственным (`Документы.Счет` → `Документ.Счет`);
- суффикс ссылочного типа у вида отбрасывается (`ДокументСсылка.Счет` → `Документ.Счет`);
- пробелы внутри сегментов схлопываются, вокруг точек и по краям удаляются.

Регистр и язык отображаемых имён сохраняются в [`canonicalize`]; сравнение идёт по
[`lookup_key`] / [`fold`], которые приводят строку к нижнему регистру, а
[`lookup_key`] ещё и записывает вид по-английски.
Все функции чистые и идемпотентные.
*/

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::configuration::metadata::{KindForm, KindLanguage, MetadataKind, KIND_FORMS};

/// Суффиксы ссылочных типов (`СправочникСсылка`, `CatalogRef`), в нижнем регистре
const REFERENCE_SUFFIXES: &[&str] = &["ссылка", "ref"];

/// Написания видов вне таблицы выгрузки: (единственное, множественное, вид)
const KIND_ALIASES: &[(&str, &str, MetadataKind)] =
    &[("Enumeration", "Enumerations", MetadataKind::Enum)];

static KIND_LOOKUP: Lazy<HashMap<String, &'static KindForm>> = Lazy::new(|| {
    let mut lookup = HashMap::new();
    for form in KIND_FORMS {
        lookup.insert(form.singular.to_lowercase(), form);
        lookup.insert(form.plural.to_lowercase(), form);
    }
    for (singular, plural, kind) in KIND_ALIASES {
        let form = kind.form(KindLanguage::English);
        lookup.insert(singular.to_lowercase(), form);
        lookup.insert(plural.to_lowercase(), form);
    }
    lookup
});

static GROUP_LOOKUP: Lazy<HashMap<String, &'static KindForm>> = Lazy::new(|| {
    let mut lookup: HashMap<String, &'static KindForm> = KIND_FORMS
        .iter()
        .map(|form| (form.plural.to_lowercase(), form))
        .collect();
    for (_, plural, kind) in KIND_ALIASES {
        lookup.insert(plural.to_lowercase(), kind.form(KindLanguage::English));
    }
    lookup
});

/// Разбивает строку на сегменты по точкам, нормализуя пробелы внутри сегментов
fn segments(input: &str) -> Vec<String> {
    input
        .split('.')
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Распознаёт вид по сегменту: единственное или множественное число,
/// с суффиксом ссылки или без, без учёта регистра
pub fn resolve_kind(segment: &str) -> Option<&'static KindForm> {
    let lowered = segment.trim().to_lowercase();
    if let Some(form) = KIND_LOOKUP.get(&lowered) {
        return Some(*form);
    }
    REFERENCE_SUFFIXES.iter().find_map(|suffix| {
        lowered
            .strip_suffix(suffix)
            .filter(|stem| !stem.is_empty())
            .and_then(|stem| KIND_LOOKUP.get(stem).copied())
    })
}

/// Вид группы верхнего уровня в выгрузке. Принимаются только множественные формы.
pub fn group_kind(key: &str) -> Option<&'static KindForm> {
    GROUP_LOOKUP.get(&key.trim().to_lowercase()).copied()
}

/// Каноническая форма с сохранением регистра имени
pub fn canonicalize(input: &str) -> String {
    let mut parts = segments(input);
    if let Some(head) = parts.first_mut() {
        if let Some(form) = resolve_kind(head) {
            *head = form.singular.to_string();
        }
    }
    parts.join(".")
}

/// Ключ для сравнения полных имён: вид в английском написании, всё в нижнем
/// регистре. `Catalog.Item` и `Справочники.Item` дают один ключ.
pub fn lookup_key(input: &str) -> String {
    let mut parts = segments(input);
    if let Some(head) = parts.first_mut() {
        if let Some(form) = resolve_kind(head) {
            *head = form.kind.form(KindLanguage::English).singular.to_string();
        }
    }
    parts.join(".").to_lowercase()
}

/// Нормализация пробелов и регистра без разбора вида (имена, синонимы)
pub fn fold(input: &str) -> String {
    segments(input).join(".").to_lowercase()
}

/// Каноническое полное имя объекта, на который ссылается объявленный тип.
///
/// `СправочникСсылка.Номенклатура` → `Справочник.Номенклатура`; для примитивных
/// типов и типов без суффикса ссылки возвращает `None`.
pub fn reference_target(type_name: &str) -> Option<String> {
    let parts = segments(type_name);
    let (head, rest) = parts.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let lowered = head.to_lowercase();
    let is_reference = REFERENCE_SUFFIXES
        .iter()
        .any(|suffix| lowered.len() > suffix.len() && lowered.ends_with(suffix));
    if !is_reference {
        return None;
    }
    let form = resolve_kind(head)?;
    Some(format!("{}.{}", form.singular, rest.join(".")))
}

/// Разобранный запрос поиска
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    /// Каноническая форма для отображения и логов
    pub canonical: String,
    /// Ключ точного совпадения с полным именем
    pub key: String,
    /// Вид, если запрос начинается с префикса вида
    pub kind: Option<MetadataKind>,
    /// Часть после префикса вида (или весь запрос) для сравнения с Имя/Синоним
    pub name_key: String,
}

pub fn parse_query(query: &str) -> NormalizedQuery {
    let canonical = canonicalize(query);
    let key = lookup_key(&canonical);
    let parts = segments(&canonical);

    let (kind, name_key) = match parts.split_first() {
        Some((head, rest)) => match resolve_kind(head) {
            Some(form) => (Some(form.kind), rest.join(".").to_lowercase()),
            None => (None, key.clone()),
        },
        None => (None, String::new()),
    };

    NormalizedQuery {
        canonical,
        key,
        kind,
        name_key,
    }
}
