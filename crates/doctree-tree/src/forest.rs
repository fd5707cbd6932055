//! Arena-allocated forest of entity and field nodes.
//!
//! Nodes live in one `Vec` and refer to each other by `NodeId`. Moving a
//! subtree is a matter of rewriting one parent link and two child lists, and
//! `owners` answers "where is entity type X placed" without a tree scan.

use std::collections::HashMap;

use doctree_catalog::normalize;
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Node type string of entity nodes.
pub const ENTITY_NODE_TYPE: &str = "doctype";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Entity,
    Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub key: String,
    pub description: String,
    /// Entity type name for entity nodes, field name for field nodes.
    pub fieldname: String,
    /// Parent `Table` field an entity node was reached through; empty when the
    /// entity's own record collection supplies data.
    pub fieldname_data: String,
    /// `doctype` for entity nodes, the generic field type otherwise.
    pub node_type: String,
    pub path: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn entity(name: &str, key: String, description: String, fieldname_data: &str) -> Self {
        Self {
            kind: NodeKind::Entity,
            key,
            description,
            fieldname: name.to_string(),
            fieldname_data: fieldname_data.to_string(),
            node_type: ENTITY_NODE_TYPE.to_string(),
            path: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn field(fieldname: &str, key: String, description: String, node_type: &str) -> Self {
        Self {
            kind: NodeKind::Field,
            key,
            description,
            fieldname: fieldname.to_string(),
            fieldname_data: String::new(),
            node_type: node_type.to_string(),
            path: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_entity(&self) -> bool {
        self.kind == NodeKind::Entity
    }

    pub fn is_field(&self) -> bool {
        self.kind == NodeKind::Field
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
    /// Entity type → its node. First placement wins for forests loaded from
    /// JSON that repeat a type.
    owners: HashMap<String, NodeId>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node to the arena.
    pub fn add(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        if node.is_entity() {
            self.owners.entry(node.fieldname.clone()).or_insert(id);
        }
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn push_root(&mut self, id: NodeId) {
        debug_assert!(self.node(id).parent.is_none());
        self.roots.push(id);
    }

    /// Node of entity type `name`, if placed.
    pub fn entity(&self, name: &str) -> Option<NodeId> {
        self.owners.get(name).copied()
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Unlink `id` from its parent, or from the root list when it has none.
    pub fn detach(&mut self, id: NodeId) {
        match self.node_mut(id).parent.take() {
            Some(parent) => self.node_mut(parent).children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`).
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }
        depth
    }

    /// Reachable nodes in document order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            forest: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Field children first, then entity children, each group in place.
    pub fn order_children(&mut self) {
        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by_key(|c| self.nodes[c.index()].is_entity());
            self.nodes[i].children = children;
        }
    }

    /// Root: `normalize(description)`; child: `parent.path + "." + normalize(description)`.
    pub fn assign_paths(&mut self) {
        let mut stack: Vec<(NodeId, Option<String>)> =
            self.roots.iter().rev().map(|r| (*r, None)).collect();

        while let Some((id, prefix)) = stack.pop() {
            let segment = normalize(&self.node(id).description);
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{segment}"),
                None => segment,
            };
            for child in self.node(id).children.iter().rev() {
                stack.push((*child, Some(path.clone())));
            }
            self.node_mut(id).path = path;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.preorder().filter(|id| self.node(*id).is_entity()).count()
    }

    pub fn field_count(&self) -> usize {
        self.preorder().filter(|id| self.node(*id).is_field()).count()
    }
}

pub struct Preorder<'a> {
    forest: &'a Forest,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.forest.children(id).iter().rev().copied());
        Some(id)
    }
}

// ============================================================================
// JSON
// ============================================================================

struct NodeView<'a> {
    forest: &'a Forest,
    id: NodeId,
}

struct ChildrenView<'a> {
    forest: &'a Forest,
    ids: &'a [NodeId],
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.forest.node(self.id);
        let mut s = serializer.serialize_struct("TreeNode", 8)?;
        s.serialize_field("key", &node.key)?;
        s.serialize_field("description", &node.description)?;
        s.serialize_field("fieldname", &node.fieldname)?;
        s.serialize_field("fieldname_data", &node.fieldname_data)?;
        s.serialize_field("type", &node.node_type)?;
        s.serialize_field("path", &node.path)?;
        s.serialize_field("dragandrop", &node.is_field())?;
        s.serialize_field(
            "children",
            &ChildrenView {
                forest: self.forest,
                ids: &node.children,
            },
        )?;
        s.end()
    }
}

impl Serialize for ChildrenView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.ids.len()))?;
        for id in self.ids {
            seq.serialize_element(&NodeView {
                forest: self.forest,
                id: *id,
            })?;
        }
        seq.end()
    }
}

/// Serialized as the nested list of root nodes.
impl Serialize for Forest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ChildrenView {
            forest: self,
            ids: &self.roots,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct NodeJson {
    #[serde(default)]
    key: String,
    #[serde(default)]
    description: String,
    fieldname: String,
    #[serde(default)]
    fieldname_data: Option<String>,
    #[serde(rename = "type", default)]
    node_type: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    children: Vec<NodeJson>,
}

impl Forest {
    fn insert_json(&mut self, json: NodeJson, parent: Option<NodeId>) {
        let node = if json.node_type == ENTITY_NODE_TYPE {
            TreeNode::entity(
                &json.fieldname,
                json.key,
                json.description,
                json.fieldname_data.as_deref().unwrap_or(""),
            )
        } else {
            TreeNode::field(&json.fieldname, json.key, json.description, &json.node_type)
        };
        let id = self.add(TreeNode {
            path: json.path,
            ..node
        });
        match parent {
            Some(parent) => self.attach(parent, id),
            None => self.push_root(id),
        }
        if self.node(id).is_entity() {
            for child in json.children {
                self.insert_json(child, Some(id));
            }
        }
    }
}

impl<'de> Deserialize<'de> for Forest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let roots = Vec::<NodeJson>::deserialize(deserializer)?;
        let mut forest = Forest::new();
        for root in roots {
            forest.insert_json(root, None);
        }
        Ok(forest)
    }
}
