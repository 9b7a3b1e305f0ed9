//! Workflow validation.

use std::collections::{HashMap, HashSet};

use super::types::WorkflowDefinition;
use crate::error::{Error, Result};

/// Validate a workflow definition.
///
/// Checks for:
/// - Required fields (id, nodes)
/// - Unique node ids
/// - Case-insensitive unique labels
/// - Connections referencing existing nodes
/// - No cycles
pub fn validate_workflow(workflow: &WorkflowDefinition) -> Result<()> {
    if workflow.id.is_empty() {
        return Err(Error::Validation("Workflow id is required".into()));
    }

    if workflow.nodes.is_empty() {
        return Err(Error::Validation(
            "Workflow must have at least one node".into(),
        ));
    }

    let mut ids = HashSet::new();
    for node in &workflow.nodes {
        if node.id.is_empty() {
            return Err(Error::Validation("Node id cannot be empty".into()));
        }
        if !ids.insert(node.id.as_str()) {
            return Err(Error::Validation(format!("Duplicate node id: {}", node.id)));
        }
    }

    let mut labels = HashSet::new();
    for node in &workflow.nodes {
        if node.label.is_empty() {
            continue;
        }
        if !labels.insert(node.label.to_lowercase()) {
            return Err(Error::Validation(format!(
                "Duplicate node label (case-insensitive): {}",
                node.label
            )));
        }
    }

    for connection in &workflow.connections {
        if !ids.contains(connection.source.as_str()) {
            return Err(Error::Validation(format!(
                "Connection references non-existent source node '{}'",
                connection.source
            )));
        }
        if !ids.contains(connection.target.as_str()) {
            return Err(Error::Validation(format!(
                "Connection references non-existent target node '{}'",
                connection.target
            )));
        }
    }

    if has_cycle(workflow) {
        return Err(Error::Validation("Workflow graph has a cycle".into()));
    }

    Ok(())
}

fn has_cycle(workflow: &WorkflowDefinition) -> bool {
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for connection in &workflow.connections {
        successors
            .entry(connection.source.as_str())
            .or_default()
            .push(connection.target.as_str());
    }

    fn dfs<'a>(
        node_id: &'a str,
        successors: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        rec_stack: &mut HashSet<&'a str>,
    ) -> bool {
        visited.insert(node_id);
        rec_stack.insert(node_id);

        if let Some(next) = successors.get(node_id) {
            for &neighbor in next {
                if rec_stack.contains(neighbor) {
                    return true;
                }
                if !visited.contains(neighbor)
                    && dfs(neighbor, successors, visited, rec_stack)
                {
                    return true;
                }
            }
        }

        rec_stack.remove(node_id);
        false
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    for node in &workflow.nodes {
        if !visited.contains(node.id.as_str())
            && dfs(node.id.as_str(), &successors, &mut visited, &mut rec_stack)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::parser::parse_definition;

    fn chain() -> WorkflowDefinition {
        parse_definition(
            r#"
id: w
nodes:
  - id: a
    label: Start
    type: trigger
  - id: b
    label: End
    type: noop
connections:
  - source: a
    target: b
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_workflow_passes() {
        assert!(validate_workflow(&chain()).is_ok());
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut workflow = chain();
        workflow.nodes[1].id = "a".into();
        let err = validate_workflow(&workflow).unwrap_err();
        assert!(err.to_string().contains("Duplicate node id"));
    }

    #[test]
    fn test_duplicate_label_case_insensitive() {
        let mut workflow = chain();
        workflow.nodes[1].label = "START".into();
        let err = validate_workflow(&workflow).unwrap_err();
        assert!(err.to_string().contains("label"));
    }

    #[test]
    fn test_dangling_connection_rejected() {
        let mut workflow = chain();
        workflow.connections[0].target = "ghost".into();
        let err = validate_workflow(&workflow).unwrap_err();
        assert!(err.to_string().contains("non-existent target"));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut workflow = chain();
        workflow
            .connections
            .push(crate::workflow::types::Connection {
                source: "b".into(),
                target: "a".into(),
                source_handle: None,
                target_handle: None,
            });
        let err = validate_workflow(&workflow).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_empty_workflow_rejected() {
        let mut workflow = chain();
        workflow.nodes.clear();
        workflow.connections.clear();
        assert!(validate_workflow(&workflow).is_err());
    }
}
