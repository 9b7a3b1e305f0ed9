//! Workflow input/output nodes for sub-workflow composition.
//!
//! `workflow_input` receives the caller's payload and validates it
//! against a declared field schema. `workflow_output` marks the items
//! that become the run's final result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowInputConfig {
    #[serde(default)]
    pub fields: Vec<InputField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowOutputConfig {
    /// Optional name callers see on the result.
    #[serde(default)]
    pub name: Option<String>,
}

/// Wrap the caller's payload and validate it. Required fields must be
/// present and non-null; typed fields must hold the declared primitive.
pub fn run_input(payload: Option<&Value>, config: &WorkflowInputConfig) -> Result<Vec<ExecutionItem>> {
    let item = match payload {
        Some(value) => ExecutionItem::from_value(value.clone()),
        None => ExecutionItem::empty(),
    };

    for field in &config.fields {
        match item.json.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(Error::Node(format!(
                        "missing required input field: {}",
                        field.name
                    )));
                }
            }
            Some(value) => {
                if !field.field_type.matches(value) {
                    return Err(Error::Node(format!(
                        "input field {} is not of type {:?}",
                        field.name, field.field_type
                    )));
                }
            }
        }
    }

    Ok(vec![item])
}

pub fn run_output(items: &[ExecutionItem], _config: &WorkflowOutputConfig) -> Result<Vec<ExecutionItem>> {
    Ok(items.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> WorkflowInputConfig {
        WorkflowInputConfig {
            fields: vec![
                InputField {
                    name: "email".into(),
                    field_type: FieldType::String,
                    required: true,
                },
                InputField {
                    name: "age".into(),
                    field_type: FieldType::Number,
                    required: false,
                },
            ],
        }
    }

    #[test]
    fn test_valid_payload_accepted() {
        let payload = json!({"email": "a@x.io", "age": 30});
        let out = run_input(Some(&payload), &schema()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_value(), payload);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let payload = json!({"age": 30});
        assert!(run_input(Some(&payload), &schema()).is_err());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let payload = json!({"email": "a@x.io", "age": "thirty"});
        assert!(run_input(Some(&payload), &schema()).is_err());
    }

    #[test]
    fn test_optional_field_may_be_absent() {
        let payload = json!({"email": "a@x.io"});
        assert!(run_input(Some(&payload), &schema()).is_ok());
    }

    #[test]
    fn test_output_passes_through() {
        let items = crate::item::values_to_items(vec![json!({"a": 1})]);
        let out = run_output(&items, &WorkflowOutputConfig::default()).unwrap();
        assert_eq!(out, items);
    }
}
