//! File-backed metadata and record source.
//!
//! Layout of a snapshot directory:
//!
//! ```text
//! <root>/doctypes.json              [{name, module, istable}]
//! <root>/fields/<normalized>.json   [FieldMeta]
//! <root>/records/<normalized>.json  [record]
//! ```
//!
//! `<normalized>` is `normalize(entity type name)`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::CatalogError;
use crate::load::read_json;
use crate::model::{FieldMeta, RecordFilter};
use crate::normalize::normalize;
use crate::record::Record;
use crate::source::{EntityTypeRef, MetadataSource, RecordSource};

pub const DOCTYPES_FILE: &str = "doctypes.json";
pub const FIELDS_DIR: &str = "fields";
pub const RECORDS_DIR: &str = "records";

#[derive(Debug)]
pub struct SnapshotSource {
    root: PathBuf,
    /// Entity type → records keyed by `name`, in file order.
    records: RefCell<HashMap<String, IndexMap<String, Record>>>,
}

impl SnapshotSource {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::unavailable(
                "snapshot",
                format!("{} is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            records: RefCell::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fields_path(&self, entity: &str) -> PathBuf {
        self.root
            .join(FIELDS_DIR)
            .join(format!("{}.json", normalize(entity)))
    }

    pub fn records_path(&self, entity: &str) -> PathBuf {
        self.root
            .join(RECORDS_DIR)
            .join(format!("{}.json", normalize(entity)))
    }

    fn with_records<R>(
        &self,
        entity: &str,
        f: impl FnOnce(&IndexMap<String, Record>) -> R,
    ) -> Result<R, CatalogError> {
        if let Some(records) = self.records.borrow().get(entity) {
            return Ok(f(records));
        }

        let path = self.records_path(entity);
        let loaded: Vec<Record> = if path.exists() {
            read_json(&path)?
        } else {
            tracing::debug!(entity, path = %path.display(), "no records file; treating as empty");
            Vec::new()
        };

        let mut records = IndexMap::with_capacity(loaded.len());
        for record in loaded {
            let Some(name) = record.name.clone() else {
                tracing::warn!(entity, "record without a name skipped");
                continue;
            };
            if records.contains_key(&name) {
                tracing::warn!(entity, name = %name, "duplicate record name; keeping first");
                continue;
            }
            records.insert(name, record);
        }

        let out = f(&records);
        self.records.borrow_mut().insert(entity.to_string(), records);
        Ok(out)
    }
}

impl MetadataSource for SnapshotSource {
    fn list_entity_types(
        &self,
        module: Option<&str>,
        is_child: bool,
    ) -> Result<Vec<EntityTypeRef>, CatalogError> {
        let path = self.root.join(DOCTYPES_FILE);
        if !path.exists() {
            return Err(CatalogError::unavailable(
                "entity types",
                format!("missing {}", path.display()),
            ));
        }
        let types: Vec<EntityTypeRef> = read_json(&path)?;
        Ok(types
            .into_iter()
            .filter(|t| t.istable == is_child)
            .filter(|t| module.map_or(true, |m| t.module.as_deref() == Some(m)))
            .collect())
    }

    fn list_fields(
        &self,
        name: &str,
        include_parent_column: bool,
    ) -> Result<Vec<FieldMeta>, CatalogError> {
        let path = self.fields_path(name);
        if !path.exists() {
            return Err(CatalogError::unavailable(
                name,
                format!("missing {}", path.display()),
            ));
        }
        let mut fields: Vec<FieldMeta> = read_json(&path)?;
        for field in &mut fields {
            field.parent = include_parent_column.then(|| name.to_string());
        }
        Ok(fields)
    }
}

impl RecordSource for SnapshotSource {
    fn list_keys(&self, name: &str, filters: &[RecordFilter]) -> Result<Vec<String>, CatalogError> {
        self.with_records(name, |records| {
            records
                .iter()
                .filter(|(_, r)| filters.iter().all(|f| f.matches(r)))
                .map(|(key, _)| key.clone())
                .collect()
        })
    }

    fn get_record(&self, name: &str, id: &str) -> Result<Record, CatalogError> {
        self.with_records(name, |records| records.get(id).cloned())?
            .ok_or_else(|| CatalogError::unavailable(name, format!("record `{id}` not found")))
    }
}
