//! doctree catalogue layer
//!
//! Everything the tree builder and the engine compiler consume as *input*:
//!
//! - entity-type metadata (`EntityCatalogue`, `FieldMeta`)
//! - caller-declared nesting overrides (`MandatoryMapping`)
//! - display translations and formula groups
//! - typed record collections (`RecordStore`, `Record`, `Value`)
//!
//! plus the collaborator seams that populate them (`MetadataSource`,
//! `RecordSource`, `ProgressSink`) and one concrete, file-backed source
//! (`SnapshotSource`). No network transport lives here: sources are traits and
//! the snapshot directory is the only built-in implementation.

pub mod assemble;
pub mod error;
pub mod load;
pub mod model;
pub mod normalize;
pub mod record;
pub mod snapshot;
pub mod source;

mod flag;

pub use assemble::{assemble_catalogue, collect_records, keep_field, CatalogueOptions};
pub use error::CatalogError;
pub use model::{
    formula_specs, generic_field_type, EntityCatalogue, FieldMeta, FormulaGroup, FormulaRow, FormulaSpec,
    MandatoryMapping, RecordFilter, Translations,
};
pub use normalize::{node_key, normalize};
pub use record::{Record, RecordStore, Value};
pub use snapshot::SnapshotSource;
pub use source::{EntityTypeRef, LogProgress, MetadataSource, ProgressSink, RecordSource};
