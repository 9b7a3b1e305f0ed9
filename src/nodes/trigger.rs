//! Trigger and noop nodes.

use serde_json::Value;

use crate::error::Result;
use crate::item::ExecutionItem;

/// Wrap an externally supplied payload into the run's initial item set.
/// No payload means one empty item, so downstream nodes always execute.
pub fn run_trigger(payload: Option<&Value>) -> Result<Vec<ExecutionItem>> {
    let item = match payload {
        Some(value) => ExecutionItem::from_value(value.clone()),
        None => ExecutionItem::empty(),
    };
    Ok(vec![item])
}

pub fn run_noop(items: &[ExecutionItem]) -> Result<Vec<ExecutionItem>> {
    Ok(items.to_vec())
}
