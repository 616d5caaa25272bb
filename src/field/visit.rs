//! Depth-first traversal over field trees
//!
//! Both passes over a tree (extraction and reinjection) implement one of the
//! two visitor traits here and let the `walk_*` functions drive them. Map
//! entries are visited in insertion order, repeater rows by index, and every
//! text leaf is handed to the visitor together with its [`FieldPath`].
//! Opaque values are never visited.

use crate::field::{FieldMap, FieldNode, FieldPath};

pub trait Visit {
    fn visit_text(&mut self, path: &FieldPath, text: &str);
}

pub trait VisitMut {
    fn visit_text_mut(&mut self, path: &FieldPath, text: &mut String);
}

/// Walk every entry of `map`; `parent` is `None` for the tree root
pub fn walk_map<V: Visit + ?Sized>(visitor: &mut V, map: &FieldMap, parent: Option<&FieldPath>) {
    for (name, node) in map {
        let path = FieldPath::child_of(parent, name);
        walk_node(visitor, node, &path);
    }
}

pub fn walk_node<V: Visit + ?Sized>(visitor: &mut V, node: &FieldNode, path: &FieldPath) {
    match node {
        FieldNode::Text(text) => visitor.visit_text(path, text),
        FieldNode::Group(map) => walk_map(visitor, map, Some(path)),
        FieldNode::Repeater(rows) => {
            for (index, row) in rows.iter().enumerate() {
                walk_map(visitor, row, Some(&path.row(index)));
            }
        }
        FieldNode::Opaque(_) => {}
    }
}

pub fn walk_map_mut<V: VisitMut + ?Sized>(
    visitor: &mut V,
    map: &mut FieldMap,
    parent: Option<&FieldPath>,
) {
    for (name, node) in map.iter_mut() {
        let path = FieldPath::child_of(parent, name);
        walk_node_mut(visitor, node, &path);
    }
}

pub fn walk_node_mut<V: VisitMut + ?Sized>(
    visitor: &mut V,
    node: &mut FieldNode,
    path: &FieldPath,
) {
    match node {
        FieldNode::Text(text) => visitor.visit_text_mut(path, text),
        FieldNode::Group(map) => walk_map_mut(visitor, map, Some(path)),
        FieldNode::Repeater(rows) => {
            for (index, row) in rows.iter_mut().enumerate() {
                walk_map_mut(visitor, row, Some(&path.row(index)));
            }
        }
        FieldNode::Opaque(_) => {}
    }
}
