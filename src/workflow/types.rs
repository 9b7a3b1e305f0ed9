//! Workflow definition types.
//!
//! A workflow is a directed graph of typed nodes joined by connections.
//! Definitions are plain data (serde all the way down) so they can be
//! stored, diffed, and compared in tests without touching the engine.

use serde::{Deserialize, Serialize};

use crate::nodes::{
    AggregateConfig, DateTimeConfig, DedupeConfig, EditFieldsConfig, ExecuteWorkflowConfig,
    FilterConfig, HttpRequestConfig, IfConfig, LimitConfig, MergeConfig, SplitOutConfig,
    SummarizeConfig, SwitchConfig, ThrowErrorConfig, TryCatchConfig, WaitConfig,
    WorkflowInputConfig, WorkflowOutputConfig,
};

/// A complete workflow definition.
///
/// # Example YAML
///
/// ```yaml
/// id: order-alerts
/// name: Order alerts
///
/// nodes:
///   - id: start
///     label: Start
///     type: trigger
///   - id: only-paid
///     label: Only paid
///     type: filter
///     config:
///       conditions:
///         - field: status
///           operator: equals
///           value: paid
///
/// connections:
///   - source: start
///     target: only-paid
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow id (used as identifier in the store).
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Nodes (steps) in the graph.
    pub nodes: Vec<NodeDefinition>,

    /// Directed edges between node output and input ports.
    #[serde(default)]
    pub connections: Vec<Connection>,

    /// Global workflow settings.
    #[serde(default)]
    pub settings: WorkflowSettings,
}

/// One configured processing step.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDefinition {
    /// Unique node id within the workflow.
    pub id: String,

    /// Display label, unique case-insensitively among siblings.
    #[serde(default)]
    pub label: String,

    /// Node kind plus its typed configuration.
    #[serde(flatten)]
    pub kind: NodeKind,

    /// Canvas position. UI-only, ignored by the engine.
    #[serde(default)]
    pub position: (f64, f64),

    /// Explicit ordering hint used to break ties among independent nodes.
    #[serde(default)]
    pub execution_order: Option<u32>,
}

/// A directed edge from a node's output port to another node's input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,

    /// Named output port on the source (branching nodes only).
    #[serde(default)]
    pub source_handle: Option<String>,

    /// Named input port on the target.
    #[serde(default)]
    pub target_handle: Option<String>,
}

/// Every node kind the engine knows, each carrying its own config.
///
/// The enum is closed on purpose: dispatch happens through one
/// exhaustive match in the coordinator, so a new kind that is not wired
/// up fails to compile instead of failing at run time. Deserialization
/// goes through [`NodeDefinition`], which treats a missing `config`
/// block as an empty one so kinds whose settings all have defaults can
/// be written bare.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum NodeKind {
    Trigger,
    Noop,
    Filter(FilterConfig),
    Limit(LimitConfig),
    RemoveDuplicates(DedupeConfig),
    Aggregate(AggregateConfig),
    Summarize(SummarizeConfig),
    SplitOut(SplitOutConfig),
    Merge(MergeConfig),
    EditFields(EditFieldsConfig),
    #[serde(rename = "datetime")]
    DateTime(DateTimeConfig),
    Wait(WaitConfig),
    HttpRequest(HttpRequestConfig),
    If(IfConfig),
    Switch(SwitchConfig),
    TryCatch(TryCatchConfig),
    ThrowError(ThrowErrorConfig),
    ExecuteWorkflow(ExecuteWorkflowConfig),
    WorkflowInput(WorkflowInputConfig),
    WorkflowOutput(WorkflowOutputConfig),
}

impl<'de> Deserialize<'de> for NodeDefinition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            #[serde(default)]
            label: String,
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            config: Option<serde_json::Value>,
            #[serde(default)]
            position: (f64, f64),
            #[serde(default)]
            execution_order: Option<u32>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let kind = NodeKind::from_parts(&raw.kind, raw.config).map_err(serde::de::Error::custom)?;
        Ok(NodeDefinition {
            id: raw.id,
            label: raw.label,
            kind,
            position: raw.position,
            execution_order: raw.execution_order,
        })
    }
}

impl NodeKind {
    /// Build a kind from its serialized `type` tag and `config` payload.
    /// A missing or null config deserializes as an empty object, so
    /// required config fields still error by name.
    fn from_parts(kind: &str, config: Option<serde_json::Value>) -> std::result::Result<Self, String> {
        use serde_json::{Map, Value};

        fn parse<T: serde::de::DeserializeOwned>(config: Option<Value>) -> std::result::Result<T, String> {
            let config = match config {
                None | Some(Value::Null) => Value::Object(Map::new()),
                Some(value) => value,
            };
            serde_json::from_value(config).map_err(|e| e.to_string())
        }

        Ok(match kind {
            "trigger" => NodeKind::Trigger,
            "noop" => NodeKind::Noop,
            "filter" => NodeKind::Filter(parse(config)?),
            "limit" => NodeKind::Limit(parse(config)?),
            "remove_duplicates" => NodeKind::RemoveDuplicates(parse(config)?),
            "aggregate" => NodeKind::Aggregate(parse(config)?),
            "summarize" => NodeKind::Summarize(parse(config)?),
            "split_out" => NodeKind::SplitOut(parse(config)?),
            "merge" => NodeKind::Merge(parse(config)?),
            "edit_fields" => NodeKind::EditFields(parse(config)?),
            "datetime" => NodeKind::DateTime(parse(config)?),
            "wait" => NodeKind::Wait(parse(config)?),
            "http_request" => NodeKind::HttpRequest(parse(config)?),
            "if" => NodeKind::If(parse(config)?),
            "switch" => NodeKind::Switch(parse(config)?),
            "try_catch" => NodeKind::TryCatch(parse(config)?),
            "throw_error" => NodeKind::ThrowError(parse(config)?),
            "execute_workflow" => NodeKind::ExecuteWorkflow(parse(config)?),
            "workflow_input" => NodeKind::WorkflowInput(parse(config)?),
            "workflow_output" => NodeKind::WorkflowOutput(parse(config)?),
            other => return Err(format!("unknown node type: {other}")),
        })
    }

    /// Stable kind name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Noop => "noop",
            NodeKind::Filter(_) => "filter",
            NodeKind::Limit(_) => "limit",
            NodeKind::RemoveDuplicates(_) => "remove_duplicates",
            NodeKind::Aggregate(_) => "aggregate",
            NodeKind::Summarize(_) => "summarize",
            NodeKind::SplitOut(_) => "split_out",
            NodeKind::Merge(_) => "merge",
            NodeKind::EditFields(_) => "edit_fields",
            NodeKind::DateTime(_) => "datetime",
            NodeKind::Wait(_) => "wait",
            NodeKind::HttpRequest(_) => "http_request",
            NodeKind::If(_) => "if",
            NodeKind::Switch(_) => "switch",
            NodeKind::TryCatch(_) => "try_catch",
            NodeKind::ThrowError(_) => "throw_error",
            NodeKind::ExecuteWorkflow(_) => "execute_workflow",
            NodeKind::WorkflowInput(_) => "workflow_input",
            NodeKind::WorkflowOutput(_) => "workflow_output",
        }
    }

    /// Whether this kind starts a run (no inbound connections expected).
    pub fn is_entry(&self) -> bool {
        matches!(self, NodeKind::Trigger | NodeKind::WorkflowInput(_))
    }

    /// Whether this kind emits multiple named output ports.
    pub fn is_branching(&self) -> bool {
        matches!(
            self,
            NodeKind::If(_) | NodeKind::Switch(_) | NodeKind::TryCatch(_)
        )
    }
}

/// Global workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Maximum run time in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Keep going after a node failure instead of failing the run.
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            continue_on_fail: false,
        }
    }
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl WorkflowDefinition {
    /// Get a node by id.
    pub fn get_node(&self, id: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Ids of nodes with no inbound connection.
    pub fn entry_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| !self.connections.iter().any(|c| c.target == n.id))
            .map(|n| n.id.as_str())
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_kind_from_tagged_json() {
        let node: NodeDefinition = serde_json::from_value(json!({
            "id": "f1",
            "label": "Keep active",
            "type": "filter",
            "config": {
                "conditions": [
                    {"field": "status", "operator": "equals", "value": "active"}
                ]
            }
        }))
        .unwrap();
        assert!(matches!(node.kind, NodeKind::Filter(_)));
        assert_eq!(node.kind.name(), "filter");
    }

    #[test]
    fn test_unit_kinds_need_no_config() {
        let node: NodeDefinition =
            serde_json::from_value(json!({"id": "t", "type": "trigger"})).unwrap();
        assert!(matches!(node.kind, NodeKind::Trigger));
        assert!(node.kind.is_entry());
    }

    #[test]
    fn test_defaultable_kinds_parse_without_config() {
        for kind in [
            "merge",
            "try_catch",
            "throw_error",
            "remove_duplicates",
            "aggregate",
            "limit",
            "wait",
            "workflow_input",
            "workflow_output",
        ] {
            let node: NodeDefinition =
                serde_json::from_value(json!({"id": "n", "type": kind}))
                    .unwrap_or_else(|e| panic!("{kind} without config should parse: {e}"));
            assert_eq!(node.kind.name(), kind);
        }
    }

    #[test]
    fn test_null_config_parses_as_defaults() {
        let node: NodeDefinition =
            serde_json::from_value(json!({"id": "m", "type": "merge", "config": null})).unwrap();
        assert!(matches!(node.kind, NodeKind::Merge(_)));
    }

    #[test]
    fn test_missing_required_config_field_still_errors() {
        let result: std::result::Result<NodeDefinition, _> =
            serde_json::from_value(json!({"id": "s", "type": "split_out"}));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("field"), "unexpected error: {message}");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: std::result::Result<NodeDefinition, _> =
            serde_json::from_value(json!({"id": "x", "type": "telepathy"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_entry_nodes() {
        let workflow: WorkflowDefinition = serde_json::from_value(json!({
            "id": "w",
            "name": "w",
            "nodes": [
                {"id": "a", "type": "trigger"},
                {"id": "b", "type": "noop"}
            ],
            "connections": [{"source": "a", "target": "b"}]
        }))
        .unwrap();
        assert_eq!(workflow.entry_nodes(), vec!["a"]);
    }
}
