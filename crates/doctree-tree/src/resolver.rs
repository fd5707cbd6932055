//! Mandatory and inferred relationships between entity types.

use std::collections::{HashMap, HashSet};

use doctree_catalog::{EntityCatalogue, MandatoryMapping};

use crate::error::BuildError;

/// Lookup indexes over one catalogue and its mandatory mappings.
///
/// Mandatory indexes keep mapping order and do not deduplicate: a child with
/// several mandatory parents is kept as listed and the first parent wins
/// downstream.
#[derive(Debug)]
pub struct Relationships<'a> {
    catalogue: &'a EntityCatalogue,
    parents_of: HashMap<&'a str, Vec<&'a str>>,
    children_of: HashMap<&'a str, Vec<&'a str>>,
    /// Parents in first-mapped order, for deterministic cycle reports.
    mapped_parents: Vec<&'a str>,
    inferred_targets: HashSet<&'a str>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl<'a> Relationships<'a> {
    pub fn resolve(catalogue: &'a EntityCatalogue, mappings: &'a [MandatoryMapping]) -> Self {
        let mut parents_of: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut children_of: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut mapped_parents = Vec::new();

        for mapping in mappings {
            for name in [&mapping.child, &mapping.parent] {
                if !catalogue.contains(name) {
                    tracing::warn!(
                        child = %mapping.child,
                        parent = %mapping.parent,
                        missing = %name,
                        "mandatory mapping names an entity type absent from the catalogue"
                    );
                }
            }
            parents_of
                .entry(mapping.child.as_str())
                .or_default()
                .push(mapping.parent.as_str());
            let children = children_of.entry(mapping.parent.as_str()).or_default();
            if children.is_empty() {
                mapped_parents.push(mapping.parent.as_str());
            }
            children.push(mapping.child.as_str());
        }

        let mut inferred_targets = HashSet::new();
        for (name, fields) in catalogue.iter() {
            for target in fields.iter().filter_map(|f| f.table_target()) {
                if target != name && catalogue.contains(target) {
                    inferred_targets.insert(target);
                }
            }
        }

        Self {
            catalogue,
            parents_of,
            children_of,
            mapped_parents,
            inferred_targets,
        }
    }

    pub fn mandatory_parents_of(&self, child: &str) -> &[&'a str] {
        self.parents_of.get(child).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mandatory_children_of(&self, parent: &str) -> &[&'a str] {
        self.children_of.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_mandatory_parent(&self, child: &str) -> bool {
        self.parents_of.contains_key(child)
    }

    /// First listed mandatory parent.
    pub fn designated_parent(&self, child: &str) -> Option<&'a str> {
        self.mandatory_parents_of(child).first().copied()
    }

    /// `Table` targets of `name` present in the catalogue, excluding `name`.
    pub fn inferred_children_of(&self, name: &str) -> Vec<&'a str> {
        self.catalogue
            .fields(name)
            .unwrap_or(&[])
            .iter()
            .filter_map(|f| f.table_target())
            .filter(|t| *t != name && self.catalogue.contains(t))
            .collect()
    }

    /// Some other catalogue type nests `name` through a `Table` field.
    pub fn is_inferred_child(&self, name: &str) -> bool {
        self.inferred_targets.contains(name)
    }

    pub fn check_acyclic(&self) -> Result<(), BuildError> {
        let mut marks = HashMap::new();
        let mut stack = Vec::new();
        for parent in self.mapped_parents.iter().copied() {
            self.visit(parent, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), BuildError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Err(BuildError::MappingCycle { cycle });
            }
            None => {}
        }

        marks.insert(name, Mark::Active);
        stack.push(name);
        for child in self.mandatory_children_of(name).iter().copied() {
            self.visit(child, marks, stack)?;
        }
        stack.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }
}
