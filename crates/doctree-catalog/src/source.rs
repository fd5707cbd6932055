//! Collaborator seams: where metadata and records come from, and where
//! progress lines go.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::flag::bool_flag;
use crate::model::{FieldMeta, RecordFilter};
use crate::record::Record;

/// An entity type as listed by a metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeRef {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    /// Child types only ever appear embedded in a parent's `Table` field.
    #[serde(default, deserialize_with = "bool_flag")]
    pub istable: bool,
}

pub trait MetadataSource {
    /// Entity types of `module` (all modules when `None`) whose child flag
    /// equals `is_child`, in source order.
    fn list_entity_types(
        &self,
        module: Option<&str>,
        is_child: bool,
    ) -> Result<Vec<EntityTypeRef>, CatalogError>;

    /// Fields of `name` in source order. `include_parent_column` asks the
    /// source to fill `FieldMeta::parent`.
    fn list_fields(
        &self,
        name: &str,
        include_parent_column: bool,
    ) -> Result<Vec<FieldMeta>, CatalogError>;
}

pub trait RecordSource {
    /// Record ids of `name` matching every filter.
    fn list_keys(&self, name: &str, filters: &[RecordFilter]) -> Result<Vec<String>, CatalogError>;

    fn get_record(&self, name: &str, id: &str) -> Result<Record, CatalogError>;
}

/// Receives human-readable progress lines.
pub trait ProgressSink {
    fn emit(&mut self, line: &str);
}

impl ProgressSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Forwards progress lines to `tracing` at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&mut self, line: &str) {
        tracing::info!(target: "doctree::progress", "{line}");
    }
}
