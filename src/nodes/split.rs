//! Split-out node - fan an array field out into one item per element.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::expression::{get_nested_value, remove_nested_value};
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOutConfig {
    /// Field expected to hold an array.
    pub field: String,

    /// When true, each element is merged into a copy of the original
    /// item's fields; otherwise the element stands alone.
    #[serde(default)]
    pub include_other_fields: bool,
}

/// For each item, emit one output item per element of the configured
/// array field. Items whose field is not an array pass through unchanged.
pub fn run(items: &[ExecutionItem], config: &SplitOutConfig) -> Result<Vec<ExecutionItem>> {
    let mut out = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let elements = match get_nested_value(&item.to_value(), &config.field) {
            Some(Value::Array(elements)) => elements.clone(),
            _ => {
                out.push(item.clone());
                continue;
            }
        };

        for element in elements {
            let json = if config.include_other_fields {
                let mut base = item.json.clone();
                remove_nested_value(&mut base, &config.field);
                match element {
                    Value::Object(map) => {
                        for (k, v) in map {
                            base.insert(k, v);
                        }
                    }
                    other => {
                        base.insert(config.field.clone(), other);
                    }
                }
                base
            } else {
                match element {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                }
            };
            out.push(item.derive(json, index));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{values_to_items, ItemLineage};
    use serde_json::json;

    #[test]
    fn test_split_with_other_fields() {
        let items = values_to_items(vec![json!({"name": "Test", "tags": ["a", "b", "c"]})]);
        let config = SplitOutConfig {
            field: "tags".into(),
            include_other_fields: true,
        };

        let out = run(&items, &config).unwrap();
        assert_eq!(out.len(), 3);
        for (item, tag) in out.iter().zip(["a", "b", "c"]) {
            assert_eq!(item.json.get("name"), Some(&json!("Test")));
            assert_eq!(item.json.get("tags"), Some(&json!(tag)));
        }
    }

    #[test]
    fn test_split_elements_alone() {
        let items = values_to_items(vec![json!({"name": "Test", "tags": [1, {"x": 2}]})]);
        let config = SplitOutConfig {
            field: "tags".into(),
            include_other_fields: false,
        };

        let out = run(&items, &config).unwrap();
        assert_eq!(out.len(), 2);
        // Non-object elements are wrapped under "value".
        assert_eq!(out[0].json.get("value"), Some(&json!(1)));
        assert_eq!(out[1].json.get("x"), Some(&json!(2)));
        assert!(out[0].json.get("name").is_none());
    }

    #[test]
    fn test_non_array_field_passes_through() {
        let items = values_to_items(vec![json!({"tags": "not-an-array"}), json!({"other": 1})]);
        let config = SplitOutConfig {
            field: "tags".into(),
            include_other_fields: true,
        };

        let out = run(&items, &config).unwrap();
        assert_eq!(out, items);
    }

    #[test]
    fn test_split_records_lineage() {
        let items = values_to_items(vec![json!({"tags": [1]}), json!({"tags": [2]})]);
        let config = SplitOutConfig {
            field: "tags".into(),
            include_other_fields: false,
        };
        let out = run(&items, &config).unwrap();
        assert_eq!(out[0].paired_item, Some(ItemLineage::Single(0)));
        assert_eq!(out[1].paired_item, Some(ItemLineage::Single(1)));
    }
}
