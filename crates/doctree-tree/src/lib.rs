//! doctree forest construction
//!
//! Turns an `EntityCatalogue` plus mandatory mappings into a rooted forest in
//! which every entity type appears exactly once:
//!
//! - `resolver`: mandatory parent/child indexes and `Table`-inferred nesting
//! - `builder`: root selection, recursive entity construction, the
//!   mandatory-mapping corrective pass, child ordering and path assignment
//! - `locator`: field path lookup used to anchor formulas
//! - `forest`: the arena itself and its JSON form

pub mod builder;
pub mod error;
pub mod forest;
pub mod locator;
pub mod resolver;

pub use builder::{apply_mandatory_mappings, build_forest};
pub use error::BuildError;
pub use forest::{Forest, NodeId, NodeKind, TreeNode, ENTITY_NODE_TYPE};
pub use locator::find_field_path;
pub use resolver::Relationships;
