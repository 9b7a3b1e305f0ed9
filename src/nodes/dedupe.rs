//! Remove-duplicates node - stream dedupe preserving first occurrence.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::expression::get_nested_value;
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Field whose value forms the dedupe key. When absent the whole
    /// payload is the key.
    #[serde(default)]
    pub field: Option<String>,
}

pub fn run(items: &[ExecutionItem], config: &DedupeConfig) -> Result<Vec<ExecutionItem>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for item in items {
        let key = dedupe_key(item, config.field.as_deref());
        if seen.insert(key) {
            out.push(item.clone());
        }
    }

    Ok(out)
}

fn dedupe_key(item: &ExecutionItem, field: Option<&str>) -> String {
    let value = match field {
        Some(field) => get_nested_value(&item.to_value(), field)
            .cloned()
            .unwrap_or(Value::Null),
        None => item.to_value(),
    };
    // Serialization of a Map is key-ordered, so equal payloads serialize
    // identically.
    serde_json::to_string(&value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::values_to_items;
    use serde_json::json;

    #[test]
    fn test_dedupe_whole_item() {
        let items = values_to_items(vec![
            json!({"id": 1}),
            json!({"id": 2}),
            json!({"id": 1}),
        ]);
        let out = run(&items, &DedupeConfig::default()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].json.get("id"), Some(&json!(1)));
        assert_eq!(out[1].json.get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_dedupe_by_field() {
        let items = values_to_items(vec![
            json!({"email": "a@x.io", "n": 1}),
            json!({"email": "b@x.io", "n": 2}),
            json!({"email": "a@x.io", "n": 3}),
        ]);
        let out = run(
            &items,
            &DedupeConfig {
                field: Some("email".into()),
            },
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        // First occurrence wins.
        assert_eq!(out[0].json.get("n"), Some(&json!(1)));
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let items = values_to_items(vec![
            json!({"id": 1}),
            json!({"id": 1}),
            json!({"id": 2}),
        ]);
        let once = run(&items, &DedupeConfig::default()).unwrap();
        let twice = run(&once, &DedupeConfig::default()).unwrap();
        assert_eq!(once, twice);
    }
}
