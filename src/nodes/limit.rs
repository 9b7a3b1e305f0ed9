//! Limit node - keep the first or last N items.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_keep_first")]
    pub keep_first: bool,
}

fn default_count() -> usize {
    1
}

fn default_keep_first() -> bool {
    true
}

pub fn run(items: &[ExecutionItem], config: &LimitConfig) -> Result<Vec<ExecutionItem>> {
    let count = config.count.min(items.len());
    let slice = if config.keep_first {
        &items[..count]
    } else {
        &items[items.len() - count..]
    };
    Ok(slice.to_vec())
}
