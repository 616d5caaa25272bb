//! Load host field objects into field trees
//!
//! The host describes each custom field of a record as a field object: the
//! field's schema (key, name, type, sub-fields) plus its current value.
//!
//! ```json
//! [
//!     {"key": "field_subtitle", "name": "subtitle", "type": "text", "value": "Hello"},
//!     {"key": "field_gallery", "name": "gallery", "type": "repeater",
//!      "sub_fields": [
//!          {"key": "field_caption", "name": "caption", "type": "text"},
//!          {"key": "field_image", "name": "image", "type": "image"}
//!      ],
//!      "value": [{"caption": "A", "image": 11}]}
//! ]
//! ```
//!
//! Text kinds become [`FieldNode::Text`], groups and repeaters are rebuilt
//! from their sub-field schema, and everything else is carried as
//! [`FieldNode::Opaque`].

use crate::field::{FieldMap, FieldNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host field kinds whose string values are translated
pub const TEXT_KINDS: [&str; 3] = ["text", "textarea", "wysiwyg"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Stable host identifier, e.g. `field_5f3a…`
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<FieldSchema>,
}

impl FieldSchema {
    pub fn new(key: &str, name: &str, kind: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            sub_fields: Vec::new(),
        }
    }

    pub fn with_sub_fields(mut self, sub_fields: Vec<FieldSchema>) -> Self {
        self.sub_fields = sub_fields;
        self
    }

    pub fn is_text(&self) -> bool {
        TEXT_KINDS.contains(&self.kind.as_str())
    }
}

/// A field's schema together with its stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldObject {
    #[serde(flatten)]
    pub schema: FieldSchema,
    #[serde(default)]
    pub value: Value,
}

/// Build a record's field tree, keyed by field key, in object order
pub fn field_tree(objects: &[FieldObject]) -> FieldMap {
    objects
        .iter()
        .map(|object| {
            (
                object.schema.key.clone(),
                node_from_value(&object.schema, &object.value),
            )
        })
        .collect()
}

/// Convert one stored value according to its schema
pub fn node_from_value(schema: &FieldSchema, value: &Value) -> FieldNode {
    match (schema.kind.as_str(), value) {
        (_, Value::String(text)) if schema.is_text() => FieldNode::Text(text.clone()),
        ("group", Value::Object(_)) => FieldNode::Group(sub_field_map(&schema.sub_fields, value)),
        ("repeater", Value::Array(rows)) if rows.iter().all(Value::is_object) => {
            FieldNode::Repeater(
                rows.iter()
                    .map(|row| sub_field_map(&schema.sub_fields, row))
                    .collect(),
            )
        }
        _ => FieldNode::Opaque(value.clone()),
    }
}

/// Sub-fields present in `value`, in schema order, keyed by name
fn sub_field_map(sub_fields: &[FieldSchema], value: &Value) -> FieldMap {
    sub_fields
        .iter()
        .filter_map(|sub| {
            value
                .get(&sub.name)
                .map(|v| (sub.name.clone(), node_from_value(sub, v)))
        })
        .collect()
}

/// Parse a field-object document: an array, or an object keyed by field name
///
/// # Errors
/// - Invalid JSON
/// - Entries that are not field objects
/// - A root that is neither an array nor an object
pub fn parse_field_objects(document: &str) -> Result<Vec<FieldObject>, String> {
    let json: Value = serde_json::from_str(document)
        .map_err(|e| format!("Failed to parse field objects: {}", e))?;

    let entries: Vec<Value> = match json {
        Value::Array(entries) => entries,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        _ => return Err("Invalid field objects: root must be an array or object".to_string()),
    };

    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry).map_err(|e| format!("Invalid field object: {}", e))
        })
        .collect()
}
