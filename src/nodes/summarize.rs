//! Summarize node - named scalar statistics over the item stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::expression::get_nested_value;
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizeOp {
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl SummarizeOp {
    fn name(&self) -> &'static str {
        match self {
            SummarizeOp::Count => "count",
            SummarizeOp::Sum => "sum",
            SummarizeOp::Average => "average",
            SummarizeOp::Min => "min",
            SummarizeOp::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeOperation {
    pub operation: SummarizeOp,
    /// Field the statistic is computed over. Ignored by `count`.
    #[serde(default)]
    pub field: Option<String>,
    /// Name of the output scalar. Defaults to `op` or `op_field`.
    #[serde(default)]
    pub output_field: Option<String>,
}

impl SummarizeOperation {
    fn output_name(&self) -> String {
        if let Some(name) = &self.output_field {
            return name.clone();
        }
        match &self.field {
            Some(field) if self.operation != SummarizeOp::Count => {
                format!("{}_{}", self.operation.name(), field)
            }
            _ => self.operation.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeConfig {
    pub operations: Vec<SummarizeOperation>,
}

/// Apply each operation, producing one output item carrying a named
/// scalar per operation. `min`/`max`/`sum`/`average` only consider
/// numeric values; `count` ignores the field and returns the item count.
pub fn run(items: &[ExecutionItem], config: &SummarizeConfig) -> Result<Vec<ExecutionItem>> {
    let mut json = Map::new();

    for op in &config.operations {
        let value = match op.operation {
            SummarizeOp::Count => Value::Number(Number::from(items.len())),
            _ => {
                let numbers = numeric_field_values(items, op.field.as_deref());
                match op.operation {
                    SummarizeOp::Sum => number(numbers.iter().sum()),
                    SummarizeOp::Average => {
                        if numbers.is_empty() {
                            Value::Null
                        } else {
                            number(numbers.iter().sum::<f64>() / numbers.len() as f64)
                        }
                    }
                    SummarizeOp::Min => numbers
                        .iter()
                        .copied()
                        .fold(None, |acc: Option<f64>, n| {
                            Some(acc.map_or(n, |a| a.min(n)))
                        })
                        .map(number)
                        .unwrap_or(Value::Null),
                    SummarizeOp::Max => numbers
                        .iter()
                        .copied()
                        .fold(None, |acc: Option<f64>, n| {
                            Some(acc.map_or(n, |a| a.max(n)))
                        })
                        .map(number)
                        .unwrap_or(Value::Null),
                    SummarizeOp::Count => unreachable!(),
                }
            }
        };
        json.insert(op.output_name(), value);
    }

    Ok(vec![ExecutionItem::from_map(json)])
}

fn numeric_field_values(items: &[ExecutionItem], field: Option<&str>) -> Vec<f64> {
    items
        .iter()
        .filter_map(|item| {
            let value = match field {
                Some(field) => get_nested_value(&item.to_value(), field).cloned()?,
                None => item.to_value(),
            };
            match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
        })
        .collect()
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::values_to_items;
    use serde_json::json;

    fn scores() -> Vec<ExecutionItem> {
        values_to_items(vec![
            json!({"score": 10}),
            json!({"score": 20}),
            json!({"score": "not numeric"}),
            json!({"score": 30}),
        ])
    }

    #[test]
    fn test_count_ignores_field() {
        let config = SummarizeConfig {
            operations: vec![SummarizeOperation {
                operation: SummarizeOp::Count,
                field: Some("whatever".into()),
                output_field: None,
            }],
        };
        let out = run(&scores(), &config).unwrap();
        assert_eq!(out[0].json.get("count"), Some(&json!(4)));
    }

    #[test]
    fn test_sum_average_min_max_skip_non_numeric() {
        let config = SummarizeConfig {
            operations: vec![
                SummarizeOperation {
                    operation: SummarizeOp::Sum,
                    field: Some("score".into()),
                    output_field: None,
                },
                SummarizeOperation {
                    operation: SummarizeOp::Average,
                    field: Some("score".into()),
                    output_field: Some("avg".into()),
                },
                SummarizeOperation {
                    operation: SummarizeOp::Min,
                    field: Some("score".into()),
                    output_field: None,
                },
                SummarizeOperation {
                    operation: SummarizeOp::Max,
                    field: Some("score".into()),
                    output_field: None,
                },
            ],
        };
        let out = run(&scores(), &config).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].json.get("sum_score"), Some(&json!(60)));
        assert_eq!(out[0].json.get("avg"), Some(&json!(20)));
        assert_eq!(out[0].json.get("min_score"), Some(&json!(10)));
        assert_eq!(out[0].json.get("max_score"), Some(&json!(30)));
    }

    #[test]
    fn test_empty_input() {
        let config = SummarizeConfig {
            operations: vec![
                SummarizeOperation {
                    operation: SummarizeOp::Count,
                    field: None,
                    output_field: None,
                },
                SummarizeOperation {
                    operation: SummarizeOp::Min,
                    field: Some("score".into()),
                    output_field: None,
                },
            ],
        };
        let out = run(&[], &config).unwrap();
        assert_eq!(out[0].json.get("count"), Some(&json!(0)));
        assert_eq!(out[0].json.get("min_score"), Some(&json!(null)));
    }
}
