//! Value utilities: nested-path access, condition evaluation, and
//! template substitution.
//!
//! These are the primitives every node executor builds on. Paths are
//! dot-separated (`"a.b.c"`); lookups stop and return `None` the moment
//! any intermediate value is missing or null.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How multiple conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    #[default]
    And,
    Or,
}

/// One comparison against a field of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Dot-separated path into the item payload.
    pub field: String,
    pub operator: ConditionOperator,
    /// Right-hand comparison value.
    #[serde(default)]
    pub value: Value,
}

/// Comparison operators.
///
/// Unrecognized operator strings fall back to strict string equality via
/// the `Other` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    #[serde(alias = "equal")]
    Equals,
    #[serde(alias = "notEqual")]
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
    Regex,
    #[serde(other)]
    Other,
}

/// Walk a dot-separated path into a JSON object.
///
/// Returns `None` as soon as any intermediate value is missing or null.
/// Array segments may be indexed numerically.
pub fn get_nested_value<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        if current.is_null() {
            return None;
        }
        match current {
            Value::Object(map) => current = map.get(segment)?,
            Value::Array(items) => {
                let index = segment.parse::<usize>().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Set a value at a dot-separated path, creating intermediate objects as
/// needed. Any non-object intermediate value is overwritten by an object.
pub fn set_nested_value(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return;
    }

    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().expect("just ensured object");
    }
    current.insert(segments[segments.len() - 1].to_string(), value);
}

/// Remove the value at a dot-separated path. Missing intermediate
/// segments are a no-op. Returns the removed value, if any.
pub fn remove_nested_value(root: &mut Map<String, Value>, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let (last, prefix) = segments.split_last()?;

    let mut current = root;
    for segment in prefix {
        current = current.get_mut(*segment)?.as_object_mut()?;
    }
    current.remove(*last)
}

/// Evaluate one condition operator against a field value.
///
/// Numeric comparisons coerce both sides with numeric parsing; a
/// non-numeric side parses to NaN and every comparison against NaN is
/// false. An invalid regex pattern yields false, never an error.
pub fn evaluate_condition(field_value: &Value, operator: ConditionOperator, compare: &Value) -> bool {
    use ConditionOperator::*;

    match operator {
        Equals => field_value == compare,
        NotEquals => field_value != compare,
        Contains => value_contains(field_value, compare),
        NotContains => !value_contains(field_value, compare),
        StartsWith => compare
            .as_str()
            .map(|prefix| stringify(field_value).starts_with(prefix))
            .unwrap_or(false),
        EndsWith => compare
            .as_str()
            .map(|suffix| stringify(field_value).ends_with(suffix))
            .unwrap_or(false),
        GreaterThan => numeric_cmp(field_value, compare, |l, r| l > r),
        LessThan => numeric_cmp(field_value, compare, |l, r| l < r),
        GreaterThanOrEqual => numeric_cmp(field_value, compare, |l, r| l >= r),
        LessThanOrEqual => numeric_cmp(field_value, compare, |l, r| l <= r),
        IsEmpty => is_empty(field_value),
        IsNotEmpty => !is_empty(field_value),
        IsTrue => matches!(field_value, Value::Bool(true)) || field_value.as_str() == Some("true"),
        IsFalse => matches!(field_value, Value::Bool(false)) || field_value.as_str() == Some("false"),
        Regex => compare
            .as_str()
            .and_then(|pattern| regex_lite::Regex::new(pattern).ok())
            .map(|re| re.is_match(&stringify(field_value)))
            .unwrap_or(false),
        Other => stringify(field_value) == stringify(compare),
    }
}

/// Evaluate a list of conditions against an item payload with the given
/// combine mode. An empty condition list matches everything.
pub fn conditions_match(item: &Value, conditions: &[Condition], combine: CombineMode) -> bool {
    let mut iter = conditions.iter().map(|condition| {
        let field_value = get_nested_value(item, &condition.field)
            .cloned()
            .unwrap_or(Value::Null);
        evaluate_condition(&field_value, condition.operator, &condition.value)
    });

    match combine {
        CombineMode::And => iter.all(|passed| passed),
        CombineMode::Or => conditions.is_empty() || iter.any(|passed| passed),
    }
}

/// Substitute literal `{{key}}` placeholders from a flat key→value map.
///
/// Keys may be dot-separated paths into `data`. Unmatched placeholders
/// are left untouched.
pub fn render_template(template: &str, data: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match get_nested_value(data, key) {
                    Some(value) => out.push_str(&stringify(value)),
                    None => {
                        // Leave the placeholder as written.
                        out.push_str(&rest[start..start + 2 + end + 2]);
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

fn value_contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle
            .as_str()
            .map(|sub| s.contains(sub))
            .unwrap_or(false),
        Value::Array(items) => items.contains(needle),
        Value::Object(map) => needle.as_str().map(|k| map.contains_key(k)).unwrap_or(false),
        _ => false,
    }
}

fn numeric_cmp(left: &Value, right: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    let l = as_f64(left);
    let r = as_f64(right);
    // NaN comparisons are false by IEEE semantics.
    cmp(l, r)
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        _ => f64::NAN,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
