//! JSON input files.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::CatalogError;
use crate::model::{EntityCatalogue, FormulaGroup, MandatoryMapping, Translations};
use crate::record::RecordStore;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(io_err)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogueFile {
    Wrapped { all_doctypes: EntityCatalogue },
    Plain(EntityCatalogue),
}

/// Accepts `{"all_doctypes": {...}}` or the bare entity map.
pub fn load_catalogue(path: &Path) -> Result<EntityCatalogue, CatalogError> {
    Ok(match read_json::<CatalogueFile>(path)? {
        CatalogueFile::Wrapped { all_doctypes } => all_doctypes,
        CatalogueFile::Plain(catalogue) => catalogue,
    })
}

pub fn load_records(path: &Path) -> Result<RecordStore, CatalogError> {
    read_json(path)
}

fn optional<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, CatalogError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(T::default()),
    }
}

pub fn load_mappings(path: Option<&Path>) -> Result<Vec<MandatoryMapping>, CatalogError> {
    optional(path)
}

pub fn load_translations(path: Option<&Path>) -> Result<Translations, CatalogError> {
    optional(path)
}

pub fn load_formulas(path: Option<&Path>) -> Result<Vec<FormulaGroup>, CatalogError> {
    optional(path)
}
