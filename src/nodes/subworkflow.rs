//! Execute-workflow node config. The nested run itself is driven by the
//! coordinator, which owns the workflow store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteWorkflowConfig {
    /// Id of the workflow to run.
    pub workflow_id: String,
}

/// Payload handed to the child run's input node: the first input item's
/// payload, or nothing when the input is empty.
pub fn child_payload(items: &[ExecutionItem]) -> Option<Value> {
    items.first().map(ExecutionItem::to_value)
}
