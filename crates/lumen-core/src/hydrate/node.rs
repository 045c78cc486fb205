//! A loosely typed document tree node.
//!
//! Only `type` and `children` are modelled; every other field (`url`, `alt`,
//! `name`, `attributes`, `position`, ...) is kept verbatim so a hydrated tree
//! serializes back with nothing lost.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const IMAGE: &str = "image";
pub const JSX_FLOW: &str = "mdxJsxFlowElement";
pub const JSX_TEXT: &str = "mdxJsxTextElement";

/// One node of an mdast-style tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            children: Vec::new(),
            fields: Map::new(),
        }
    }

    /// A string field such as `url` or `alt`.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether this is an `img` JSX element.
    pub fn is_jsx_img(&self) -> bool {
        (self.kind == JSX_FLOW || self.kind == JSX_TEXT) && self.str_field("name") == Some("img")
    }

    /// JSX attributes, empty when absent.
    pub fn attributes(&self) -> &[Value] {
        self.fields
            .get("attributes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Literal string value of a named JSX attribute.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|attr| attribute_name(attr) == Some(name))
            .and_then(|attr| attr.get("value"))
            .and_then(Value::as_str)
    }
}

/// `name="value"`
pub fn string_attribute(name: &str, value: &str) -> Value {
    json!({ "type": "mdxJsxAttribute", "name": name, "value": value })
}

/// `name={value}`
pub fn expression_attribute(name: &str, value: impl ToString) -> Value {
    json!({
        "type": "mdxJsxAttribute",
        "name": name,
        "value": { "type": "mdxJsxAttributeValueExpression", "value": value.to_string() },
    })
}

fn attribute_name(attr: &Value) -> Option<&str> {
    attr.get("name").and_then(Value::as_str)
}

/// Keep `existing` attributes in order, minus any that `generated` replaces,
/// then append `generated`. Spread attributes have no name and always stay.
pub fn merge_attributes(existing: &[Value], generated: Vec<Value>) -> Vec<Value> {
    let replaced: Vec<&str> = generated.iter().filter_map(attribute_name).collect();
    let mut merged: Vec<Value> = existing
        .iter()
        .filter(|attr| !matches!(attribute_name(attr), Some(name) if replaced.contains(&name)))
        .cloned()
        .collect();
    merged.extend(generated);
    merged
}
