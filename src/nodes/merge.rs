//! Merge node - recombine item streams from multiple inbound branches.
//!
//! The coordinator concatenates all upstream inputs in connection order
//! before calling into this module, so the executor only sees one list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::expression::get_nested_value;
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeMode {
    #[default]
    Append,
    Combine,
    ChooseBranch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CombineBy {
    #[default]
    MergeByPosition,
    MergeByKey,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub mode: MergeMode,
    #[serde(default)]
    pub combine_by: CombineBy,
    /// Field whose value groups items in `mergeByKey` mode.
    #[serde(default)]
    pub key_field: Option<String>,
}

pub fn run(items: &[ExecutionItem], config: &MergeConfig) -> Result<Vec<ExecutionItem>> {
    match config.mode {
        MergeMode::Append => Ok(items.to_vec()),
        MergeMode::ChooseBranch => Ok(items.iter().take(1).cloned().collect()),
        MergeMode::Combine => match config.combine_by {
            CombineBy::MergeByPosition => Ok(merge_by_position(items)),
            CombineBy::MergeByKey => {
                let field = config.key_field.as_deref().ok_or_else(|| {
                    Error::Node("merge by key requires a key field".to_string())
                })?;
                Ok(merge_by_key(items, field))
            }
        },
    }
}

/// Zip the first half of the list against the second half, merging object
/// fields pairwise. With an odd count the unpaired trailing item passes
/// through unchanged.
fn merge_by_position(items: &[ExecutionItem]) -> Vec<ExecutionItem> {
    let half = items.len() / 2;
    let mut out = Vec::with_capacity(items.len() - half);

    for i in 0..half {
        let mut json = items[i].json.clone();
        for (k, v) in &items[half + i].json {
            json.insert(k.clone(), v.clone());
        }
        out.push(ExecutionItem::from_map(json));
    }
    for item in &items[half * 2..] {
        out.push(item.clone());
    }

    out
}

/// Group items by the value at `field`, merging all items sharing a key.
/// Later items' fields overwrite earlier ones. Output order follows first
/// appearance of each key.
fn merge_by_key(items: &[ExecutionItem], field: &str) -> Vec<ExecutionItem> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, ExecutionItem> =
        std::collections::HashMap::new();

    for item in items {
        let key_value = get_nested_value(&item.to_value(), field)
            .cloned()
            .unwrap_or(Value::Null);
        let key = serde_json::to_string(&key_value).unwrap_or_default();

        match groups.get_mut(&key) {
            Some(existing) => {
                for (k, v) in &item.json {
                    existing.json.insert(k.clone(), v.clone());
                }
            }
            None => {
                order.push(key.clone());
                groups.insert(key, item.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect()
}
