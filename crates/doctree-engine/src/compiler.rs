//! Record-aligned walk of the forest.
//!
//! Every entity node yields one `EngineHead` holding one `EngineItem` per
//! record, or a single placeholder item when there are none, so every path of
//! the forest is touched at least once.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use doctree_catalog::{formula_specs, FormulaGroup, Record, RecordStore, Value};
use doctree_tree::{find_field_path, Forest, NodeId};
use serde::{Deserialize, Serialize};

use crate::context::CompilationContext;
use crate::output::{EngineHead, EngineItem, FieldValue, FormulaRef, FormulaUpdate};
use crate::references::ReferenceTable;

/// Scalar values of placeholder items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaceholderPolicy {
    /// Every scalar is `null`.
    #[default]
    Null,
    /// A type-appropriate default per generic field type.
    TypedDefaults,
}

impl PlaceholderPolicy {
    pub fn value_for(self, generic_type: &str) -> Value {
        match self {
            PlaceholderPolicy::Null => Value::Null,
            PlaceholderPolicy::TypedDefaults => match generic_type {
                "numeric" => Value::Int(0),
                "boolean" => Value::Bool(false),
                "date" => Value::Text("1999-01-01".into()),
                "datetime" => Value::Text("1999-01-01 00:00:00".into()),
                "time" => Value::Text("00:00:00".into()),
                _ => Value::Text(String::new()),
            },
        }
    }
}

impl FromStr for PlaceholderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null" => Ok(PlaceholderPolicy::Null),
            "typed-defaults" => Ok(PlaceholderPolicy::TypedDefaults),
            other => Err(format!(
                "unknown placeholder policy `{other}` (expected null or typed-defaults)"
            )),
        }
    }
}

impl fmt::Display for PlaceholderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaceholderPolicy::Null => "null",
            PlaceholderPolicy::TypedDefaults => "typed-defaults",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompileOptions {
    #[serde(default)]
    pub placeholder: PlaceholderPolicy,
}

/// Heads in forest root order plus every path touched while producing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub heads: Vec<EngineHead>,
    pub references: ReferenceTable,
}

/// Where a node's records come from.
#[derive(Debug, Clone, Copy)]
enum RecordSlice<'a> {
    /// The node's own collection in the record store.
    Store,
    /// Rows embedded in the parent's open record.
    Embedded(&'a [Record]),
}

pub struct EngineCompiler<'a> {
    forest: &'a Forest,
    store: &'a RecordStore,
    options: CompileOptions,
    formulas: HashMap<String, Vec<FormulaRef>>,
    unresolved: Vec<FormulaUpdate>,
}

impl<'a> EngineCompiler<'a> {
    pub fn new(
        forest: &'a Forest,
        groups: &[FormulaGroup],
        store: &'a RecordStore,
        options: CompileOptions,
    ) -> Self {
        let mut formulas: HashMap<String, Vec<FormulaRef>> = HashMap::new();
        let mut unresolved = Vec::new();
        let mut well_formed = 0usize;

        for spec in formula_specs(groups) {
            well_formed += 1;
            let update = FormulaUpdate {
                doctype: spec.doctype.to_string(),
                fieldname: spec.fieldname.to_string(),
            };
            match find_field_path(forest, spec.doctype, spec.fieldname) {
                Some(path) => formulas
                    .entry(spec.doctype.to_string())
                    .or_default()
                    .push(FormulaRef {
                        path: path.to_string(),
                        value: spec.expression.to_string(),
                        update,
                    }),
                None => {
                    tracing::warn!(
                        doctype = spec.doctype,
                        fieldname = spec.fieldname,
                        "formula target not found in forest; formula dropped"
                    );
                    unresolved.push(update);
                }
            }
        }

        let rows: usize = groups.iter().map(|g| g.tableformulas.len()).sum();
        if rows > well_formed {
            tracing::debug!(skipped = rows - well_formed, "malformed formula rows skipped");
        }

        Self {
            forest,
            store,
            options,
            formulas,
            unresolved,
        }
    }

    /// Formulas whose target field could not be located.
    pub fn unresolved_targets(&self) -> &[FormulaUpdate] {
        &self.unresolved
    }

    pub fn compile(&self) -> Compilation {
        let mut ctx = CompilationContext::new();
        let heads = self.compile_with(&mut ctx);
        Compilation {
            heads,
            references: ctx.into_references(),
        }
    }

    pub fn compile_with(&self, ctx: &mut CompilationContext) -> Vec<EngineHead> {
        self.forest
            .roots()
            .iter()
            .map(|root| {
                let slice = if self.forest.node(*root).fieldname_data.is_empty() {
                    RecordSlice::Store
                } else {
                    RecordSlice::Embedded(&[])
                };
                self.traverse_node(ctx, *root, slice, false)
            })
            .collect()
    }

    fn traverse_node(
        &self,
        ctx: &mut CompilationContext,
        id: NodeId,
        slice: RecordSlice<'a>,
        reset: bool,
    ) -> EngineHead {
        let node = self.forest.node(id);
        ctx.touch(&node.path);

        let records = match slice {
            RecordSlice::Store => self.store.get(&node.fieldname),
            RecordSlice::Embedded(rows) => rows,
        };
        let start = ctx.open_cursor(&node.path, reset);
        let remaining = records.get(start..).unwrap_or(&[]);

        let mut data = Vec::with_capacity(remaining.len().max(1));
        if remaining.is_empty() {
            data.push(self.placeholder_item(ctx, id));
        } else {
            for record in remaining {
                ctx.advance(&node.path);
                data.push(self.record_item(ctx, id, record));
            }
        }

        EngineHead {
            path: node.path.clone(),
            formulas: self
                .formulas
                .get(&node.fieldname)
                .cloned()
                .unwrap_or_default(),
            data,
        }
    }

    fn record_item(&self, ctx: &mut CompilationContext, id: NodeId, record: &'a Record) -> EngineItem {
        let mut item = EngineItem {
            id: record.name.clone(),
            creation: record.creation.clone(),
            ..EngineItem::default()
        };

        for child_id in self.forest.children(id) {
            let child = self.forest.node(*child_id);
            ctx.touch(&child.path);
            if child.is_field() {
                item.fields.push(FieldValue {
                    path: child.path.clone(),
                    field_type: child.node_type.clone(),
                    value: record.value_of(&child.fieldname),
                });
            } else {
                let slice = if child.fieldname_data.is_empty() {
                    RecordSlice::Store
                } else {
                    RecordSlice::Embedded(record.table(&child.fieldname_data))
                };
                item.children.push(self.traverse_node(ctx, *child_id, slice, true));
            }
        }
        item
    }

    fn placeholder_item(&self, ctx: &mut CompilationContext, id: NodeId) -> EngineItem {
        let mut item = EngineItem::default();

        for child_id in self.forest.children(id) {
            let child = self.forest.node(*child_id);
            ctx.touch(&child.path);
            if child.is_field() {
                item.fields.push(FieldValue {
                    path: child.path.clone(),
                    field_type: child.node_type.clone(),
                    value: self.options.placeholder.value_for(&child.node_type),
                });
            } else {
                item.children
                    .push(self.traverse_node(ctx, *child_id, RecordSlice::Embedded(&[]), true));
            }
        }
        item
    }
}

/// Walk `forest` against `store` and attach `groups`' formulas.
pub fn compile(
    forest: &Forest,
    groups: &[FormulaGroup],
    store: &RecordStore,
    options: CompileOptions,
) -> Compilation {
    EngineCompiler::new(forest, groups, store, options).compile()
}
