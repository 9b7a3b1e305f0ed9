//! Try/catch node - route items by whether the upstream chain failed.
//!
//! The coordinator decides if a failure happened in scope; this module
//! only performs the routing.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::ExecutionItem;
use crate::nodes::{NodeOutput, PortOutput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TryCatchScope {
    /// All transitive predecessors back to the nearest prior try/catch.
    #[default]
    Chain,
    /// Direct predecessors only.
    Immediate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TryCatchConfig {
    #[serde(default)]
    pub scope: TryCatchScope,
}

/// Failure observed somewhere in the watched upstream scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub node: String,
    pub message: String,
}

pub const SUCCESS_PORT: &str = "success";
pub const ERROR_PORT: &str = "error";

/// Route the current item set to `success` or `error`. A failure with no
/// surviving items synthesizes a single item describing the error, so the
/// error path always has something to work with.
pub fn run(items: &[ExecutionItem], failure: Option<&UpstreamFailure>) -> Result<NodeOutput> {
    let (success, error) = match failure {
        None => (items.to_vec(), Vec::new()),
        Some(failure) => {
            let error_items = if items.is_empty() {
                vec![ExecutionItem::from_value(json!({
                    "error": {
                        "node": failure.node,
                        "message": failure.message,
                    }
                }))]
            } else {
                items.to_vec()
            };
            (Vec::new(), error_items)
        }
    };

    Ok(NodeOutput::Branches(vec![
        PortOutput::new(SUCCESS_PORT, success),
        PortOutput::new(ERROR_PORT, error),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::values_to_items;

    #[test]
    fn test_success_path() {
        let items = values_to_items(vec![json!({"a": 1})]);
        let out = run(&items, None).unwrap();
        assert_eq!(out.port_items(Some(SUCCESS_PORT)).len(), 1);
        assert!(out.port_items(Some(ERROR_PORT)).is_empty());
    }

    #[test]
    fn test_error_path_carries_items() {
        let items = values_to_items(vec![json!({"a": 1}), json!({"a": 2})]);
        let failure = UpstreamFailure {
            node: "fetch".into(),
            message: "boom".into(),
        };
        let out = run(&items, Some(&failure)).unwrap();
        assert!(out.port_items(Some(SUCCESS_PORT)).is_empty());
        assert_eq!(out.port_items(Some(ERROR_PORT)).len(), 2);
    }

    #[test]
    fn test_error_path_synthesizes_item_when_empty() {
        let failure = UpstreamFailure {
            node: "fetch".into(),
            message: "connection refused".into(),
        };
        let out = run(&[], Some(&failure)).unwrap();
        let error_items = out.port_items(Some(ERROR_PORT));
        assert_eq!(error_items.len(), 1);
        assert_eq!(
            error_items[0].to_value(),
            json!({"error": {"node": "fetch", "message": "connection refused"}})
        );
    }
}
