use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::viz::style::StyleSet;

// Basic type aliases for clarity
pub type EntityId = String;
pub type Properties = Map<String, Value>;

/// A node value as it arrives from the query result source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub identity: EntityId,
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// A relationship value as it arrives from the query result source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub identity: EntityId,
    pub start: EntityId,
    pub end: EntityId,
    pub rel_type: String,
    pub properties: Properties,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RowValue {
    Node(GraphNode),
    Relationship(GraphRelationship),
    // Anything the extractor does not draw (numbers, strings, paths, lists...)
    Scalar(Value),
}

impl RowValue {
    /// Classify a raw driver value. Values that are neither node-like nor
    /// relationship-like are kept as scalars.
    pub fn classify(value: Value) -> RowValue {
        let Value::Object(obj) = &value else {
            return RowValue::Scalar(value);
        };
        let Some(identity) = obj.get("identity").and_then(identity_string) else {
            return RowValue::Scalar(value);
        };
        let properties = match obj.get("properties") {
            Some(Value::Object(p)) => p.clone(),
            _ => Properties::new(),
        };

        if let Some(Value::Array(raw_labels)) = obj.get("labels") {
            let labels: Option<Vec<String>> = raw_labels
                .iter()
                .map(|l| l.as_str().map(str::to_string))
                .collect();
            if let Some(labels) = labels {
                return RowValue::Node(GraphNode { identity, labels, properties });
            }
            return RowValue::Scalar(value);
        }

        let start = obj.get("start").and_then(identity_string);
        let end = obj.get("end").and_then(identity_string);
        let rel_type = obj.get("type").and_then(Value::as_str);
        match (start, end, rel_type) {
            (Some(start), Some(end), Some(rel_type)) => RowValue::Relationship(GraphRelationship {
                identity,
                start,
                end,
                rel_type: rel_type.to_string(),
                properties,
            }),
            _ => RowValue::Scalar(value),
        }
    }
}

/// Stable string form of a driver identity: element id strings pass through,
/// integers are printed in decimal, and split 64-bit `{low, high}` integers are
/// recombined first.
pub fn identity_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_u64().map(|u| u.to_string())
            }
        }
        Value::Object(_) => split_integer(value).map(|i| i.to_string()),
        _ => None,
    }
}

fn split_integer(value: &Value) -> Option<i64> {
    let obj = value.as_object()?;
    if obj.len() != 2 {
        return None;
    }
    let low = obj.get("low")?.as_i64()?;
    let high = obj.get("high")?.as_i64()?;
    Some((high << 32) | (low as u32 as i64))
}

/// Plain-text rendering of a property value for captions and the sidebar.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => match split_integer(value) {
            Some(i) => i.to_string(),
            None => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// One result record: named columns in the order the query returned them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, RowValue)>,
}

impl ResultRow {
    pub fn new() -> Self { Self::default() }

    pub fn from_columns(columns: Vec<(String, RowValue)>) -> Self {
        Self { columns }
    }

    pub fn push(&mut self, key: impl Into<String>, value: RowValue) {
        self.columns.push((key.into(), value));
    }

    pub fn with(mut self, key: impl Into<String>, value: RowValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&RowValue> {
        self.columns.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &RowValue> {
        self.columns.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
}

/// Renderer-agnostic node handed to the rendering host.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewNode {
    pub id: EntityId,
    // ":Label1:Label2", the default caption
    pub label: String,
    pub source_labels: Vec<String>,
    pub properties: Properties,
    pub style: StyleSet,
    // Resolved caption text
    pub caption: String,
}

impl ViewNode {
    pub fn from_graph_node(node: &GraphNode) -> Self {
        let label = format!(":{}", node.labels.join(":"));
        Self {
            id: node.identity.clone(),
            caption: label.clone(),
            label,
            source_labels: node.labels.clone(),
            properties: node.properties.clone(),
            style: StyleSet::default(),
        }
    }

    /// The style-grouping key. Label-less nodes have none.
    pub fn primary_label(&self) -> Option<&str> {
        self.source_labels.first().map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ViewEdge {
    pub id: EntityId,
    pub start_id: EntityId,
    pub end_id: EntityId,
    // ":TYPE"
    pub label: String,
    pub rel_type: String,
    pub properties: Properties,
    pub style: StyleSet,
}

impl ViewEdge {
    pub fn from_relationship(rel: &GraphRelationship) -> Self {
        Self {
            id: rel.identity.clone(),
            start_id: rel.start.clone(),
            end_id: rel.end.clone(),
            label: format!(":{}", rel.rel_type),
            rel_type: rel.rel_type.clone(),
            properties: rel.properties.clone(),
            style: StyleSet::default(),
        }
    }
}
