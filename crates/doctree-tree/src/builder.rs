//! Forest construction.
//!
//! Three steps: build every entity type exactly once (roots first, inferred
//! children deferred so they nest under their `Table` owner), move mandatory
//! children under their designated parent, then order children and assign
//! paths.

use std::collections::{HashMap, HashSet};

use doctree_catalog::{node_key, EntityCatalogue, MandatoryMapping, Translations};

use crate::error::BuildError;
use crate::forest::{Forest, NodeId, TreeNode};
use crate::resolver::Relationships;

pub fn build_forest(
    catalogue: &EntityCatalogue,
    mappings: &[MandatoryMapping],
    translations: &Translations,
) -> Result<Forest, BuildError> {
    let relationships = Relationships::resolve(catalogue, mappings);
    relationships.check_acyclic()?;

    let mut builder = Builder {
        catalogue,
        relationships: &relationships,
        translations,
        forest: Forest::new(),
    };
    let mut visited = HashSet::new();

    // Roots: no mandatory parent and nobody nests them through a table.
    for name in catalogue.names() {
        if relationships.has_mandatory_parent(name) || relationships.is_inferred_child(name) {
            continue;
        }
        builder.build_root(name, &mut visited);
    }

    // Leftovers whose owner is absent or not yet built. Non-inferred types go
    // first so their tables can still claim inferred children.
    for name in catalogue.names() {
        if !relationships.is_inferred_child(name) {
            builder.build_root(name, &mut visited);
        }
    }
    for name in catalogue.names() {
        builder.build_root(name, &mut visited);
    }

    let mut forest = builder.forest;
    apply_mandatory_mappings(&mut forest, mappings);
    forest.order_children();
    forest.assign_paths();

    tracing::info!(
        roots = forest.roots().len(),
        entities = forest.entity_count(),
        fields = forest.field_count(),
        "forest built"
    );
    Ok(forest)
}

struct Builder<'a> {
    catalogue: &'a EntityCatalogue,
    relationships: &'a Relationships<'a>,
    translations: &'a Translations,
    forest: Forest,
}

impl<'a> Builder<'a> {
    fn build_root(&mut self, name: &str, visited: &mut HashSet<String>) {
        if visited.contains(name) {
            return;
        }
        let id = self.build_entity(name, "", visited);
        self.forest.push_root(id);
    }

    /// Build `name` and everything it owns. `visited` holds every entity type
    /// already placed anywhere in the forest.
    fn build_entity(
        &mut self,
        name: &str,
        fieldname_data: &str,
        visited: &mut HashSet<String>,
    ) -> NodeId {
        visited.insert(name.to_string());
        let catalogue = self.catalogue;
        let relationships = self.relationships;

        let key = node_key(name);
        let description = self.translations.describe(&key, name);
        let id = self
            .forest
            .add(TreeNode::entity(name, key, description, fieldname_data));

        let fields = catalogue.fields(name).unwrap_or(&[]);
        for field in fields.iter().filter(|f| !f.is_table()) {
            let label = field.display_label();
            let key = node_key(label);
            let description = self.translations.describe(&key, label);
            let child = self.forest.add(TreeNode::field(
                &field.fieldname,
                key,
                description,
                field.generic_type(),
            ));
            self.forest.attach(id, child);
        }

        let mandatory = relationships.mandatory_children_of(name);
        for child in mandatory.iter().copied() {
            if !catalogue.contains(child) || visited.contains(child) {
                continue;
            }
            let node = self.build_entity(child, "", visited);
            self.forest.attach(id, node);
        }

        for field in fields {
            let Some(related) = field.table_target() else {
                continue;
            };
            if !catalogue.contains(related) {
                tracing::debug!(
                    entity = name,
                    field = %field.fieldname,
                    table = related,
                    "table target not in catalogue"
                );
                continue;
            }
            if mandatory.contains(&related) {
                continue;
            }
            let parents = relationships.mandatory_parents_of(related);
            if !parents.is_empty() && !parents.contains(&name) {
                continue;
            }
            if visited.contains(related) {
                tracing::debug!(entity = name, table = related, "table target already placed");
                continue;
            }
            let node = self.build_entity(related, &field.fieldname, visited);
            self.forest.attach(id, node);
        }

        id
    }
}

/// Move every mandatory child under its designated (first listed) parent.
///
/// A mapping whose child or parent is not in the forest changes nothing. When
/// the parent currently sits inside the child's subtree, it is lifted out to a
/// root first, together with the chain of already-settled mandatory parents
/// holding it.
pub fn apply_mandatory_mappings(forest: &mut Forest, mappings: &[MandatoryMapping]) {
    let mut settled: HashMap<&str, &str> = HashMap::new();

    for mapping in mappings {
        if settled.contains_key(mapping.child.as_str()) {
            tracing::debug!(
                child = %mapping.child,
                parent = %mapping.parent,
                "child already settled by an earlier mapping"
            );
            continue;
        }
        settled.insert(&mapping.child, &mapping.parent);

        let (Some(child), Some(parent)) = (forest.entity(&mapping.child), forest.entity(&mapping.parent))
        else {
            tracing::warn!(
                child = %mapping.child,
                parent = %mapping.parent,
                "mandatory mapping skipped: entity type not in forest"
            );
            continue;
        };
        if child == parent {
            continue;
        }

        if forest.is_ancestor(child, parent) {
            let lifted = settled_chain_top(forest, &settled, child, parent);
            forest.detach(lifted);
            forest.node_mut(lifted).fieldname_data.clear();
            forest.push_root(lifted);
        }

        if forest.node(child).parent != Some(parent) {
            forest.detach(child);
            forest.attach(parent, child);
        }
        forest.node_mut(child).fieldname_data.clear();
    }
}

/// Highest node between `child` (exclusive) and `parent` (inclusive) reached
/// from `parent` through settled mandatory edges only.
fn settled_chain_top(
    forest: &Forest,
    settled: &HashMap<&str, &str>,
    child: NodeId,
    parent: NodeId,
) -> NodeId {
    let mut top = parent;
    while let Some(up) = forest.node(top).parent {
        if up == child {
            break;
        }
        let name = forest.node(top).fieldname.as_str();
        let holder = forest.node(up).fieldname.as_str();
        if settled.get(name) != Some(&holder) {
            break;
        }
        top = up;
    }
    top
}
