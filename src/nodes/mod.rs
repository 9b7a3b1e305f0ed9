//! Node executors.
//!
//! One module per node kind. Each holds the kind's strongly typed config
//! struct and a pure executor function over `ExecutionItem`s (http and
//! sub-workflow execution are async). Dispatch happens through a single
//! exhaustive match in the coordinator, so adding a kind without wiring
//! it up is a compile error.

pub mod aggregate;
pub mod datetime;
pub mod dedupe;
pub mod filter;
pub mod http;
pub mod if_node;
pub mod io;
pub mod limit;
pub mod merge;
pub mod set;
pub mod split;
pub mod subworkflow;
pub mod summarize;
pub mod switch;
pub mod throw;
pub mod trigger;
pub mod try_catch;
pub mod wait;

pub use aggregate::AggregateConfig;
pub use datetime::DateTimeConfig;
pub use dedupe::DedupeConfig;
pub use filter::FilterConfig;
pub use http::HttpRequestConfig;
pub use if_node::IfConfig;
pub use io::{WorkflowInputConfig, WorkflowOutputConfig};
pub use limit::LimitConfig;
pub use merge::MergeConfig;
pub use set::EditFieldsConfig;
pub use split::SplitOutConfig;
pub use subworkflow::ExecuteWorkflowConfig;
pub use summarize::SummarizeConfig;
pub use switch::SwitchConfig;
pub use throw::ThrowErrorConfig;
pub use try_catch::TryCatchConfig;
pub use wait::WaitConfig;

use crate::item::ExecutionItem;

/// Items emitted on one named output port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortOutput {
    pub port: String,
    pub items: Vec<ExecutionItem>,
}

impl PortOutput {
    pub fn new(port: impl Into<String>, items: Vec<ExecutionItem>) -> Self {
        Self {
            port: port.into(),
            items,
        }
    }
}

/// What a node produced.
///
/// Single-output nodes emit `Items`; branching nodes (if, switch,
/// try_catch) emit one `PortOutput` per named port. Ports exist even when
/// empty so downstream input gathering always finds them.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    Items(Vec<ExecutionItem>),
    Branches(Vec<PortOutput>),
}

impl NodeOutput {
    /// Items on the main (first) output port.
    pub fn main_items(&self) -> &[ExecutionItem] {
        match self {
            NodeOutput::Items(items) => items,
            NodeOutput::Branches(ports) => ports.first().map(|p| p.items.as_slice()).unwrap_or(&[]),
        }
    }

    /// Items for a connection's source handle. `None` selects the main
    /// port; single-output nodes ignore the handle.
    pub fn port_items(&self, handle: Option<&str>) -> &[ExecutionItem] {
        match (self, handle) {
            (NodeOutput::Items(items), _) => items,
            (NodeOutput::Branches(_), None) => self.main_items(),
            (NodeOutput::Branches(ports), Some(handle)) => ports
                .iter()
                .find(|p| p.port == handle)
                .map(|p| p.items.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Total item count across all ports.
    pub fn item_count(&self) -> usize {
        match self {
            NodeOutput::Items(items) => items.len(),
            NodeOutput::Branches(ports) => ports.iter().map(|p| p.items.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_items_on_branches() {
        let output = NodeOutput::Branches(vec![
            PortOutput::new("success", vec![ExecutionItem::from_value(json!({"a": 1}))]),
            PortOutput::new("error", vec![]),
        ]);
        assert_eq!(output.port_items(Some("success")).len(), 1);
        assert_eq!(output.port_items(Some("error")).len(), 0);
        assert_eq!(output.port_items(Some("unknown")).len(), 0);
        // No handle selects the first port.
        assert_eq!(output.port_items(None).len(), 1);
    }

    #[test]
    fn test_single_output_ignores_handle() {
        let output = NodeOutput::Items(vec![ExecutionItem::empty()]);
        assert_eq!(output.port_items(Some("anything")).len(), 1);
    }
}
