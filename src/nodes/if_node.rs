//! If node - route each item to the first branch whose conditions match.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expression::{conditions_match, CombineMode, Condition};
use crate::item::ExecutionItem;
use crate::nodes::{NodeOutput, PortOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfBranch {
    /// Output port name. Defaults to `branch_{index}`.
    #[serde(default)]
    pub name: Option<String>,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub combine_with: CombineMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfConfig {
    pub branches: Vec<IfBranch>,
    /// When true, non-matching items land on an `else` port instead of
    /// being dropped.
    #[serde(default)]
    pub else_enabled: bool,
}

pub const ELSE_PORT: &str = "else";

pub fn branch_port(branch: &IfBranch, index: usize) -> String {
    branch
        .name
        .clone()
        .unwrap_or_else(|| format!("branch_{index}"))
}

/// First match wins; an item appears on exactly one output.
pub fn run(items: &[ExecutionItem], config: &IfConfig) -> Result<NodeOutput> {
    let mut ports: Vec<PortOutput> = config
        .branches
        .iter()
        .enumerate()
        .map(|(index, branch)| PortOutput {
            port: branch_port(branch, index),
            items: Vec::new(),
        })
        .collect();
    if config.else_enabled {
        ports.push(PortOutput {
            port: ELSE_PORT.to_string(),
            items: Vec::new(),
        });
    }

    for item in items {
        let value = item.to_value();
        let matched = config
            .branches
            .iter()
            .position(|branch| conditions_match(&value, &branch.conditions, branch.combine_with));

        match matched {
            Some(index) => ports[index].items.push(item.clone()),
            None if config.else_enabled => {
                let last = ports.len() - 1;
                ports[last].items.push(item.clone());
            }
            None => {}
        }
    }

    Ok(NodeOutput::Branches(ports))
}
