//! Aggregate node - collapse all items into exactly one output item.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::expression::get_nested_value;
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Field to collect across items. When absent, whole payloads are
    /// collected.
    #[serde(default)]
    pub field: Option<String>,

    /// Name of the field the collected array is written under.
    #[serde(default = "default_output_field")]
    pub output_field: String,
}

fn default_output_field() -> String {
    "data".to_string()
}

pub fn run(items: &[ExecutionItem], config: &AggregateConfig) -> Result<Vec<ExecutionItem>> {
    let collected: Vec<Value> = match &config.field {
        Some(field) => items
            .iter()
            .map(|item| {
                get_nested_value(&item.to_value(), field)
                    .cloned()
                    .unwrap_or(Value::Null)
            })
            .collect(),
        None => items.iter().map(ExecutionItem::to_value).collect(),
    };

    let mut json = Map::new();
    json.insert(config.output_field.clone(), Value::Array(collected));

    Ok(vec![ExecutionItem::from_map(json)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::values_to_items;
    use serde_json::json;

    #[test]
    fn test_aggregate_field_values() {
        let items = values_to_items(vec![
            json!({"name": "a", "score": 1}),
            json!({"name": "b", "score": 2}),
        ]);
        let out = run(
            &items,
            &AggregateConfig {
                field: Some("score".into()),
                output_field: "scores".into(),
            },
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].json.get("scores"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_aggregate_whole_items() {
        let items = values_to_items(vec![json!({"a": 1}), json!({"b": 2})]);
        let out = run(
            &items,
            &AggregateConfig {
                field: None,
                output_field: default_output_field(),
            },
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].json.get("data"), Some(&json!([{"a": 1}, {"b": 2}])));
    }

    #[test]
    fn test_aggregate_empty_input_yields_one_item() {
        let out = run(
            &[],
            &AggregateConfig {
                field: None,
                output_field: default_output_field(),
            },
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].json.get("data"), Some(&json!([])));
    }

    #[test]
    fn test_aggregate_missing_field_collects_null() {
        let items = values_to_items(vec![json!({"score": 1}), json!({"other": 2})]);
        let out = run(
            &items,
            &AggregateConfig {
                field: Some("score".into()),
                output_field: "scores".into(),
            },
        )
        .unwrap();
        assert_eq!(out[0].json.get("scores"), Some(&json!([1, null])));
    }
}
