use crate::forest::Forest;

/// Path of `field` on entity type `entity_type`.
///
/// Depth-first in document order; at every entity node of `entity_type` the
/// direct children are scanned for `field`. When the type occurs more than
/// once (forests loaded from JSON may repeat one), the first placement wins.
pub fn find_field_path<'f>(forest: &'f Forest, entity_type: &str, field: &str) -> Option<&'f str> {
    forest
        .preorder()
        .map(|id| forest.node(id))
        .filter(|node| node.is_entity() && node.fieldname == entity_type)
        .find_map(|node| {
            node.children
                .iter()
                .map(|c| forest.node(*c))
                .find(|c| c.fieldname == field)
        })
        .map(|node| node.path.as_str())
}
