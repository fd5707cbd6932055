//! Run configuration: JSON file, then environment, then command-line flags.

use std::path::{Path, PathBuf};

use doctree_catalog::load::read_json;
use doctree_catalog::{CatalogError, CatalogueOptions};
use doctree_engine::{ChildKey, CompileOptions, DocumentKey, OutputKeys, PlaceholderPolicy};
use serde::{Deserialize, Serialize};

pub const ENV_SNAPSHOT_DIR: &str = "DOCTREE_SNAPSHOT_DIR";
pub const ENV_OUTPUT_DIR: &str = "DOCTREE_OUTPUT_DIR";
pub const ENV_MODULE: &str = "DOCTREE_MODULE";

pub const DEFAULT_OUTPUT_DIR: &str = "out";
pub const FOREST_FILE: &str = "forest.json";
pub const ENGINE_FILE: &str = "engine.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub snapshot_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub module: Option<String>,
    pub mappings: Option<PathBuf>,
    pub translations: Option<PathBuf>,
    pub formulas: Option<PathBuf>,
    pub ignored_entity_types: Vec<String>,
    pub children_key: ChildKey,
    pub document_key: DocumentKey,
    pub placeholder: PlaceholderPolicy,
}

/// Values given on the command line; `None` leaves the configured value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub snapshot_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub module: Option<String>,
    pub mappings: Option<PathBuf>,
    pub translations: Option<PathBuf>,
    pub formulas: Option<PathBuf>,
    pub ignored_entity_types: Vec<String>,
    pub children_key: Option<ChildKey>,
    pub document_key: Option<DocumentKey>,
    pub placeholder: Option<PlaceholderPolicy>,
}

impl RunConfig {
    /// Read `path` when given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "reading run configuration");
                read_json(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = set(ENV_SNAPSHOT_DIR) {
            self.snapshot_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = set(ENV_OUTPUT_DIR) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(module) = set(ENV_MODULE) {
            self.module = Some(module);
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.snapshot_dir, overrides.snapshot_dir);
        take(&mut self.output_dir, overrides.output_dir);
        take(&mut self.module, overrides.module);
        take(&mut self.mappings, overrides.mappings);
        take(&mut self.translations, overrides.translations);
        take(&mut self.formulas, overrides.formulas);
        for ignored in overrides.ignored_entity_types {
            if !self.ignored_entity_types.contains(&ignored) {
                self.ignored_entity_types.push(ignored);
            }
        }
        if let Some(key) = overrides.children_key {
            self.children_key = key;
        }
        if let Some(key) = overrides.document_key {
            self.document_key = key;
        }
        if let Some(policy) = overrides.placeholder {
            self.placeholder = policy;
        }
    }

    /// Snapshot directory, which `run` cannot do without.
    pub fn require_snapshot(&self) -> Result<&Path, CatalogError> {
        self.snapshot_dir.as_deref().ok_or_else(|| {
            CatalogError::Configuration(format!(
                "no snapshot directory configured (pass --snapshot or set {ENV_SNAPSHOT_DIR})"
            ))
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn catalogue_options(&self) -> CatalogueOptions {
        CatalogueOptions {
            module: self.module.clone(),
            ignored_entity_types: self.ignored_entity_types.clone(),
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            placeholder: self.placeholder,
        }
    }

    pub fn output_keys(&self) -> OutputKeys {
        OutputKeys {
            children: self.children_key,
            document: self.document_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn file_values_load_with_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doctree.json");
        fs::write(
            &path,
            r#"{"snapshot_dir": "snap", "children_key": "data", "placeholder": "typed-defaults"}"#,
        )
        .unwrap();

        let config = RunConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("snap")));
        assert_eq!(config.children_key, ChildKey::Data);
        assert_eq!(config.document_key, DocumentKey::Data);
        assert_eq!(config.placeholder, PlaceholderPolicy::TypedDefaults);
        assert_eq!(config.output_dir(), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn environment_then_flags_take_precedence() {
        let mut config = RunConfig {
            snapshot_dir: Some("from-file".into()),
            module: Some("Selling".into()),
            ..RunConfig::default()
        };
        let env: HashMap<&str, &str> = [
            (ENV_SNAPSHOT_DIR, "from-env"),
            (ENV_OUTPUT_DIR, "env-out"),
            (ENV_MODULE, "  "),
        ]
        .into_iter()
        .collect();
        config.apply_env_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.snapshot_dir, Some(PathBuf::from("from-env")));
        assert_eq!(config.module.as_deref(), Some("Selling"));

        config.apply_overrides(Overrides {
            output_dir: Some("flag-out".into()),
            document_key: Some(DocumentKey::Dados),
            ignored_entity_types: vec!["Version".into()],
            ..Overrides::default()
        });
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("from-env")));
        assert_eq!(config.output_dir(), PathBuf::from("flag-out"));
        assert_eq!(config.output_keys().document, DocumentKey::Dados);
        assert_eq!(config.catalogue_options().ignored_entity_types, ["Version"]);
    }

    #[test]
    fn missing_snapshot_is_a_configuration_error() {
        let err = RunConfig::default().require_snapshot().unwrap_err();
        assert!(matches!(err, CatalogError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_key_values_fail_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"children_key": "kids"}"#).unwrap();
        assert!(matches!(
            RunConfig::load(Some(path.as_path())),
            Err(CatalogError::Json { .. })
        ));
    }
}
