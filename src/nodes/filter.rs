//! Filter node - keep items matching a set of conditions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expression::{conditions_match, CombineMode, Condition};
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub combine_with: CombineMode,
}

/// Keep items where the conditions, combined with and/or, evaluate true.
pub fn run(items: &[ExecutionItem], config: &FilterConfig) -> Result<Vec<ExecutionItem>> {
    if config.conditions.is_empty() {
        return Err(Error::Node(
            "Filter node requires at least one condition".to_string(),
        ));
    }

    Ok(items
        .iter()
        .filter(|item| conditions_match(&item.to_value(), &config.conditions, config.combine_with))
        .cloned()
        .collect())
}
