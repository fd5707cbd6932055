//! Input data model: entity metadata, mandatory mappings, translations and
//! formula groups.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::flag::{bool_flag, lenient_string};
use crate::record::{Record, Value};

// ============================================================================
// Field metadata
// ============================================================================

/// Field types that only shape the upstream form layout.
pub const LAYOUT_FIELD_TYPES: [&str; 3] = ["Section Break", "Column Break", "Tab Break"];

/// One field of an entity type, as listed by the metadata source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub fieldname: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fieldtype: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, deserialize_with = "bool_flag")]
    pub hidden: bool,
    /// Owning entity type; only present when the source was asked for it.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl FieldMeta {
    pub fn new(fieldname: &str, fieldtype: &str) -> Self {
        Self {
            fieldname: fieldname.to_string(),
            fieldtype: Some(fieldtype.to_string()),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_options(mut self, options: &str) -> Self {
        self.options = Some(options.to_string());
        self
    }

    pub fn fieldtype(&self) -> &str {
        self.fieldtype.as_deref().unwrap_or("")
    }

    pub fn is_table(&self) -> bool {
        self.fieldtype() == "Table"
    }

    /// Child entity type nested through this field (`Table` with options).
    pub fn table_target(&self) -> Option<&str> {
        if !self.is_table() {
            return None;
        }
        self.options.as_deref().map(str::trim).filter(|o| !o.is_empty())
    }

    pub fn is_layout(&self) -> bool {
        LAYOUT_FIELD_TYPES.contains(&self.fieldtype())
    }

    /// Label for display; falls back to the field name when the label is blank.
    pub fn display_label(&self) -> &str {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => &self.fieldname,
        }
    }

    pub fn generic_type(&self) -> &'static str {
        generic_field_type(self.fieldtype())
    }
}

/// Map an upstream field type onto the small set of types the engine knows.
pub fn generic_field_type(fieldtype: &str) -> &'static str {
    match fieldtype {
        "Data" => "string",
        "Date" => "date",
        "Datetime" => "datetime",
        "Time" => "time",
        "Int" | "Float" | "Currency" | "Percent" => "numeric",
        "Check" => "boolean",
        "Select" => "select",
        "Long Text" | "Small Text" | "Text" | "Text Editor" => "text",
        "Table" => "doctype",
        _ => "string",
    }
}

// ============================================================================
// Entity catalogue
// ============================================================================

/// Entity-type name → ordered field list, in source order.
///
/// Order matters: it decides which unrelated entity types become roots first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCatalogue {
    entities: IndexMap<String, Vec<FieldMeta>>,
}

impl EntityCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an entity type, keeping its original position.
    pub fn insert(&mut self, name: impl Into<String>, fields: Vec<FieldMeta>) {
        self.entities.insert(name.into(), fields);
    }

    pub fn with_entity(mut self, name: &str, fields: Vec<FieldMeta>) -> Self {
        self.insert(name, fields);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<FieldMeta>> {
        self.entities.shift_remove(name)
    }

    pub fn fields(&self, name: &str) -> Option<&[FieldMeta]> {
        self.entities.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entities.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldMeta])> + '_ {
        self.entities.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }
}

impl FromIterator<(String, Vec<FieldMeta>)> for EntityCatalogue {
    fn from_iter<I: IntoIterator<Item = (String, Vec<FieldMeta>)>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Mandatory mappings
// ============================================================================

/// Equality filter applied by record sources when listing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub field: String,
    pub value: serde_json::Value,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.value_of(&self.field);
        match (&actual, &self.value) {
            (Value::Text(a), serde_json::Value::String(b)) => a == b,
            _ => actual.to_json() == self.value,
        }
    }
}

/// Forced parent-child nesting that overrides inferred relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandatoryMapping {
    pub child: String,
    pub parent: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RecordFilter>,
}

impl MandatoryMapping {
    pub fn new(child: &str, parent: &str) -> Self {
        Self {
            child: child.to_string(),
            parent: parent.to_string(),
            filters: Vec::new(),
        }
    }
}

// ============================================================================
// Translations
// ============================================================================

/// Node key → localized description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(HashMap<String, String>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.0.insert(key.into(), text.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Translated text for `key`, or `fallback` when there is none.
    pub fn describe(&self, key: &str, fallback: &str) -> String {
        self.get(key).unwrap_or(fallback).to_string()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Translations {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Formula groups
// ============================================================================

/// One upstream formula group document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaGroup {
    #[serde(default)]
    pub tableformulas: Vec<FormulaRow>,
}

/// A formula row as stored upstream. Any of the keys may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub groupfielddoctype: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub groupfieldfieldname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub formula: Option<String>,
}

/// A well-formed formula: the field it updates and its expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulaSpec<'a> {
    pub doctype: &'a str,
    pub fieldname: &'a str,
    pub expression: &'a str,
}

impl FormulaRow {
    pub fn new(doctype: &str, fieldname: &str, formula: &str) -> Self {
        Self {
            groupfielddoctype: Some(doctype.to_string()),
            groupfieldfieldname: Some(fieldname.to_string()),
            formula: Some(formula.to_string()),
        }
    }

    /// `None` when any key is missing.
    pub fn spec(&self) -> Option<FormulaSpec<'_>> {
        Some(FormulaSpec {
            doctype: self.groupfielddoctype.as_deref()?,
            fieldname: self.groupfieldfieldname.as_deref()?,
            expression: self.formula.as_deref()?,
        })
    }
}

/// Every well-formed formula across all groups, in document order.
pub fn formula_specs(groups: &[FormulaGroup]) -> impl Iterator<Item = FormulaSpec<'_>> + '_ {
    groups
        .iter()
        .flat_map(|g| g.tableformulas.iter())
        .filter_map(FormulaRow::spec)
}
