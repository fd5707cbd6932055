use std::path::PathBuf;

/// Failures of catalogue inputs and their sources.
///
/// Structural inconsistencies (a mapping naming an unknown type, a record
/// without an expected field) are not errors; they are resolved where they are
/// found and reported with `tracing::warn!`.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A required input is absent or invalid. Fatal for the run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A metadata or record source could not deliver. Callers may retry.
    #[error("data unavailable for `{entity}`: {reason}")]
    DataUnavailable { entity: String, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    pub fn unavailable(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. } | Self::Io { .. })
    }
}
