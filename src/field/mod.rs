//! Field trees attached to content records
//!
//! A record carries, beyond its built-in title/content/excerpt, a tree of
//! custom fields: plain text leaves, fixed-shape groups, repeaters with a
//! variable number of rows, and everything else (numbers, image references,
//! links) that is never translated.
//!
//! The tree is walked twice per translation: once to pull out translatable
//! text ([`extract`]) and once to put translations back ([`reinject`]). Both
//! walks go through [`visit`] so they agree on traversal order and on the
//! [`FieldPath`] of every leaf.

use indexmap::IndexMap;
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;

pub mod extract;
pub mod loader;
pub mod reinject;
pub mod text_set;
pub mod visit;

pub use extract::extract;
pub use loader::{FieldObject, FieldSchema, field_tree, parse_field_objects};
pub use reinject::reinject;
pub use text_set::TextSet;

/// Field name → node, in declaration order
pub type FieldMap = IndexMap<String, FieldNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldNode {
    /// Translatable string (text, textarea, rich text)
    Text(String),
    /// Fixed set of named sub-fields
    Group(FieldMap),
    /// Ordered rows, each with the same sub-field names
    Repeater(Vec<FieldMap>),
    /// Anything else; carried through untouched
    Opaque(Value),
}

impl FieldNode {
    pub fn text(value: &str) -> Self {
        FieldNode::Text(value.to_string())
    }

    /// True when both nodes have the same kind, sub-field names and row counts.
    /// Leaf values are ignored.
    pub fn same_shape(&self, other: &FieldNode) -> bool {
        match (self, other) {
            (FieldNode::Text(_), FieldNode::Text(_)) => true,
            (FieldNode::Opaque(a), FieldNode::Opaque(b)) => a == b,
            (FieldNode::Group(a), FieldNode::Group(b)) => maps_same_shape(a, b),
            (FieldNode::Repeater(a), FieldNode::Repeater(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| maps_same_shape(x, y))
            }
            _ => false,
        }
    }

    /// Plain JSON value as the host stores it
    pub fn to_value(&self) -> Value {
        match self {
            FieldNode::Text(text) => Value::String(text.clone()),
            FieldNode::Group(map) => Value::Object(map_to_object(map)),
            FieldNode::Repeater(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Object(map_to_object(row)))
                    .collect(),
            ),
            FieldNode::Opaque(value) => value.clone(),
        }
    }
}

fn map_to_object(map: &FieldMap) -> serde_json::Map<String, Value> {
    map.iter()
        .map(|(name, node)| (name.clone(), node.to_value()))
        .collect()
}

/// Same keys in the same order, each pair of nodes with the same shape
pub fn maps_same_shape(a: &FieldMap, b: &FieldMap) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|((ka, na), (kb, nb))| ka == kb && na.same_shape(nb))
}

/// Position of a leaf in a field tree, e.g. `field_rows.2.caption`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root(name: &str) -> Self {
        FieldPath(name.to_string())
    }

    /// Path of a named sub-field; a root path when there is no parent
    pub fn child_of(parent: Option<&FieldPath>, name: &str) -> Self {
        match parent {
            Some(parent) => parent.child(name),
            None => FieldPath::root(name),
        }
    }

    pub fn child(&self, name: &str) -> Self {
        FieldPath(format!("{}.{}", self.0, name))
    }

    /// Path of a zero-based repeater row
    pub fn row(&self, index: usize) -> Self {
        FieldPath(format!("{}.{}", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath(path.to_string())
    }
}
