//! Switch node - first-match-wins routing over an ordered list of named
//! cases, with a `fallback` port for the rest.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expression::{conditions_match, CombineMode, Condition};
use crate::item::ExecutionItem;
use crate::nodes::{NodeOutput, PortOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub name: String,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub combine_with: CombineMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub cases: Vec<SwitchCase>,
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
}

fn default_fallback_enabled() -> bool {
    true
}

pub const FALLBACK_PORT: &str = "fallback";

pub fn run(items: &[ExecutionItem], config: &SwitchConfig) -> Result<NodeOutput> {
    let mut ports: Vec<PortOutput> = config
        .cases
        .iter()
        .map(|case| PortOutput::new(case.name.clone(), Vec::new()))
        .collect();
    if config.fallback_enabled {
        ports.push(PortOutput::new(FALLBACK_PORT, Vec::new()));
    }

    for item in items {
        let value = item.to_value();
        let matched = config
            .cases
            .iter()
            .position(|case| conditions_match(&value, &case.conditions, case.combine_with));

        match matched {
            Some(index) => ports[index].items.push(item.clone()),
            None if config.fallback_enabled => {
                let last = ports.len() - 1;
                ports[last].items.push(item.clone());
            }
            None => {}
        }
    }

    Ok(NodeOutput::Branches(ports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ConditionOperator;
    use crate::item::values_to_items;
    use serde_json::json;

    fn config() -> SwitchConfig {
        let case = |name: &str, tier: &str| SwitchCase {
            name: name.to_string(),
            conditions: vec![Condition {
                field: "tier".into(),
                operator: ConditionOperator::Equals,
                value: json!(tier),
            }],
            combine_with: CombineMode::And,
        };
        SwitchConfig {
            cases: vec![case("gold", "gold"), case("silver", "silver")],
            fallback_enabled: true,
        }
    }

    #[test]
    fn test_items_route_to_named_cases() {
        let items = values_to_items(vec![
            json!({"tier": "silver"}),
            json!({"tier": "gold"}),
            json!({"tier": "bronze"}),
        ]);
        let out = run(&items, &config()).unwrap();

        assert_eq!(out.port_items(Some("gold")).len(), 1);
        assert_eq!(out.port_items(Some("silver")).len(), 1);
        let fallback = out.port_items(Some(FALLBACK_PORT));
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].json.get("tier"), Some(&json!("bronze")));
    }

    #[test]
    fn test_each_item_on_exactly_one_port() {
        let items = values_to_items(vec![json!({"tier": "gold"}); 3]);
        let out = run(&items, &config()).unwrap();
        assert_eq!(out.item_count(), items.len());
        assert_eq!(out.port_items(Some("gold")).len(), 3);
    }

    #[test]
    fn test_no_fallback_drops_unmatched() {
        let mut cfg = config();
        cfg.fallback_enabled = false;
        let items = values_to_items(vec![json!({"tier": "bronze"})]);
        let out = run(&items, &cfg).unwrap();
        assert_eq!(out.item_count(), 0);
    }
}
