//! Workflow definitions: types, parsing, validation, and graph queries.

pub mod graph;
pub mod parser;
pub mod types;
pub mod validator;

pub use graph::ExecutionGraph;
pub use parser::{parse_definition, parse_definition_file};
pub use types::{
    Connection, NodeDefinition, NodeKind, WorkflowDefinition, WorkflowSettings,
};
pub use validator::validate_workflow;
