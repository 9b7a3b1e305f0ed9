//! Workflow definition parser (YAML or JSON text).

use std::path::Path;

use super::types::WorkflowDefinition;
use crate::error::{Error, Result};

/// Parse a workflow definition from YAML or JSON text. JSON input is
/// detected by its leading `{`; everything else goes through the YAML
/// parser.
pub fn parse_definition(text: &str) -> Result<WorkflowDefinition> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Parse("Empty workflow definition".to_string()));
    }

    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed)
            .map_err(|e| Error::Parse(format!("Invalid JSON: {}", e)));
    }

    serde_yaml::from_str(trimmed).map_err(|e| {
        let msg = e.to_string();
        if let Some(field) = extract_missing_field(&msg) {
            Error::Parse(format!("Missing required field: {}", field))
        } else {
            Error::Parse(format!("Invalid YAML: {}", msg))
        }
    })
}

/// Parse a workflow definition from a file path.
pub fn parse_definition_file(path: &Path) -> Result<WorkflowDefinition> {
    let content = std::fs::read_to_string(path)?;
    parse_definition(&content)
}

fn extract_missing_field(error_message: &str) -> Option<&str> {
    let marker = "missing field `";
    let start = error_message.find(marker)? + marker.len();
    let rest = &error_message[start..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::NodeKind;

    #[test]
    fn test_parse_simple_workflow() {
        let yaml = r#"
id: order-alerts
name: Order alerts

nodes:
  - id: start
    label: Start
    type: trigger

  - id: only-paid
    label: Only paid
    type: filter
    config:
      conditions:
        - field: status
          operator: equals
          value: paid

connections:
  - source: start
    target: only-paid
"#;

        let workflow = parse_definition(yaml).unwrap();
        assert_eq!(workflow.id, "order-alerts");
        assert_eq!(workflow.nodes.len(), 2);
        assert!(matches!(workflow.nodes[1].kind, NodeKind::Filter(_)));
        assert_eq!(workflow.connections[0].source, "start");
    }

    #[test]
    fn test_parse_branching_connection_handles() {
        let yaml = r#"
id: routed
nodes:
  - id: start
    type: trigger
  - id: split
    type: if
    config:
      branches:
        - name: big
          conditions:
            - field: amount
              operator: greaterThan
              value: 100
      else_enabled: true
  - id: after
    type: noop
connections:
  - source: start
    target: split
  - source: split
    target: after
    source_handle: big
"#;

        let workflow = parse_definition(yaml).unwrap();
        assert_eq!(
            workflow.connections[1].source_handle.as_deref(),
            Some("big")
        );
    }

    #[test]
    fn test_parse_nodes_without_config_block() {
        let yaml = r#"
id: bare
nodes:
  - id: start
    type: trigger
  - id: join
    type: merge
  - id: catch
    type: try_catch
  - id: boom
    type: throw_error
  - id: out
    type: workflow_output
"#;
        let workflow = parse_definition(yaml).unwrap();
        assert_eq!(workflow.nodes.len(), 5);
        assert!(matches!(workflow.nodes[1].kind, NodeKind::Merge(_)));
        assert!(matches!(workflow.nodes[2].kind, NodeKind::TryCatch(_)));
        assert!(matches!(workflow.nodes[3].kind, NodeKind::ThrowError(_)));
    }

    #[test]
    fn test_parse_json_definition() {
        let json = r#"{
            "id": "w1",
            "name": "json workflow",
            "nodes": [{"id": "t", "type": "trigger"}],
            "connections": []
        }"#;
        let workflow = parse_definition(json).unwrap();
        assert_eq!(workflow.id, "w1");
    }

    #[test]
    fn test_parse_empty_definition() {
        let result = parse_definition("   ");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .to_lowercase()
            .contains("empty workflow"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_definition("id: [broken");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .to_lowercase()
            .contains("invalid yaml"));
    }

    #[test]
    fn test_parse_missing_required_field_id() {
        let yaml = r#"
name: nameless
nodes:
  - id: t
    type: trigger
"#;
        let result = parse_definition(yaml);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Missing required field: id"));
    }
}
