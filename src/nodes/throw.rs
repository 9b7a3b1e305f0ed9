//! Throw-error node - fail deterministically with a configured error.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowErrorConfig {
    #[serde(default = "default_error_type")]
    pub error_type: String,
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_error_type() -> String {
    "Error".to_string()
}

fn default_message() -> String {
    "Workflow error".to_string()
}

/// Always fails, independent of its inputs. The error carries exactly
/// the configured type and message.
pub fn run(_items: &[ExecutionItem], config: &ThrowErrorConfig) -> Result<Vec<ExecutionItem>> {
    Err(Error::Node(format!(
        "{}: {}",
        config.error_type, config.message
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::values_to_items;
    use serde_json::json;

    #[test]
    fn test_always_fails_with_configured_error() {
        let config = ThrowErrorConfig {
            error_type: "PaymentError".into(),
            message: "card declined".into(),
        };
        let err = run(&[], &config).unwrap_err();
        assert_eq!(err.to_string(), "Node error: PaymentError: card declined");

        let items = values_to_items(vec![json!({"a": 1})]);
        assert!(run(&items, &config).is_err());
    }

    #[test]
    fn test_defaults() {
        let config: ThrowErrorConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.error_type, "Error");
        assert_eq!(config.message, "Workflow error");
    }
}
