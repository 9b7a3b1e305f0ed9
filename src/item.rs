//! The record format flowing between nodes.
//!
//! Every node consumes and produces `ExecutionItem`s. The `json` payload
//! is the data a node operates on; `binary` holds references to out-of-band
//! blobs; `paired_item` tracks which upstream item(s) produced a derived
//! item. Lineage is informational only — nothing in the engine depends on
//! it for correctness.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Reference to a binary payload stored outside the item stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryRef {
    /// Storage identifier for the blob.
    pub id: String,
    /// MIME type (e.g. "image/png").
    pub mime_type: String,
    /// Original file name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Which upstream item(s) a derived item came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemLineage {
    /// Index of the single source item in the upstream output.
    Single(usize),
    /// Several source items (merge nodes).
    Many(Vec<usize>),
}

/// One structured record flowing through the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionItem {
    /// Structured payload.
    #[serde(default)]
    pub json: Map<String, Value>,

    /// Binary attachments keyed by property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<HashMap<String, BinaryRef>>,

    /// Upstream lineage, when tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<ItemLineage>,
}

impl ExecutionItem {
    /// Create an item with an empty payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an item from a JSON value. Objects become the payload
    /// directly; any other value is wrapped under `"value"`.
    pub fn from_value(value: Value) -> Self {
        let json = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            json,
            binary: None,
            paired_item: None,
        }
    }

    /// Create an item from an object map.
    pub fn from_map(json: Map<String, Value>) -> Self {
        Self {
            json,
            binary: None,
            paired_item: None,
        }
    }

    /// The payload as a `Value::Object`.
    pub fn to_value(&self) -> Value {
        Value::Object(self.json.clone())
    }

    /// Derive a new item from this one, carrying binary data and recording
    /// lineage back to `source_index`.
    pub fn derive(&self, json: Map<String, Value>, source_index: usize) -> Self {
        Self {
            json,
            binary: self.binary.clone(),
            paired_item: Some(ItemLineage::Single(source_index)),
        }
    }
}

/// Convert a list of items into a JSON array of their payloads.
pub fn items_to_values(items: &[ExecutionItem]) -> Vec<Value> {
    items.iter().map(ExecutionItem::to_value).collect()
}

/// Wrap a list of JSON values as items (objects pass through, scalars are
/// wrapped under `"value"`).
pub fn values_to_items(values: Vec<Value>) -> Vec<ExecutionItem> {
    values.into_iter().map(ExecutionItem::from_value).collect()
}
