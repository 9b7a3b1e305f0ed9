//! Edit-fields node - set, remove, and rename fields on nested paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::expression::{remove_nested_value, set_nested_value};
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoerceTo {
    Number,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum FieldOp {
    #[serde(rename_all = "camelCase")]
    Set {
        field: String,
        value: Value,
        #[serde(default)]
        value_type: Option<CoerceTo>,
    },
    Remove { field: String },
    Rename { field: String, to: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFieldsConfig {
    pub operations: Vec<FieldOp>,
    /// When true, operations run against an empty object instead of a
    /// copy of the input item.
    #[serde(default)]
    pub keep_only_set: bool,
}

pub fn run(items: &[ExecutionItem], config: &EditFieldsConfig) -> Result<Vec<ExecutionItem>> {
    let out = items
        .iter()
        .map(|item| {
            let mut json = if config.keep_only_set {
                Map::new()
            } else {
                item.json.clone()
            };

            for op in &config.operations {
                match op {
                    FieldOp::Set {
                        field,
                        value,
                        value_type,
                    } => {
                        let value = match value_type {
                            Some(CoerceTo::Number) => coerce_number(value),
                            Some(CoerceTo::Boolean) => coerce_boolean(value),
                            None => value.clone(),
                        };
                        set_nested_value(&mut json, field, value);
                    }
                    FieldOp::Remove { field } => {
                        remove_nested_value(&mut json, field);
                    }
                    FieldOp::Rename { field, to } => {
                        if let Some(value) = remove_nested_value(&mut json, field) {
                            set_nested_value(&mut json, to, value);
                        }
                    }
                }
            }

            let mut edited = item.clone();
            edited.json = json;
            edited
        })
        .collect();

    Ok(out)
}

/// Numbers pass through; numeric strings parse; anything else keeps its
/// original value.
fn coerce_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Value::Number(Number::from(n as i64))
            }
            Ok(n) => Number::from_f64(n).map(Value::Number).unwrap_or_else(|| value.clone()),
            Err(_) => value.clone(),
        },
        Value::Bool(b) => Value::Number(Number::from(if *b { 1 } else { 0 })),
        _ => value.clone(),
    }
}

fn coerce_boolean(value: &Value) -> Value {
    match value {
        Value::Bool(_) => value.clone(),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        Value::Number(n) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        _ => value.clone(),
    }
}
