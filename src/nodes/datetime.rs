//! Date/time node and the calendar helpers behind it.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::expression::{get_nested_value, set_nested_value};
use crate::item::ExecutionItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTimeAction {
    Now,
    Format,
    Add,
    Subtract,
    Extract,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Seconds,
    Minutes,
    Hours,
    #[default]
    Days,
    Weeks,
    Months,
    Years,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    DayOfWeek,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateTimeConfig {
    pub action: DateTimeAction,
    /// Input field holding a date string. Absent means the current time.
    #[serde(default)]
    pub field: Option<String>,
    /// Output pattern. Defaults to the input's own precision.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub unit: DateUnit,
    #[serde(default)]
    pub part: Option<DatePart>,
    #[serde(default = "default_output_field")]
    pub output_field: String,
}

fn default_output_field() -> String {
    "date".to_string()
}

const FULL_PATTERN: &str = "YYYY-MM-DD HH:mm:ss";
const DATE_PATTERN: &str = "YYYY-MM-DD";

/// Render `date` using the zero-padded token set
/// `YYYY`, `MM`, `DD`, `HH`, `mm`, `ss`.
pub fn format_date(date: &DateTime<Utc>, pattern: &str) -> String {
    pattern
        .replace("YYYY", &format!("{:04}", date.year()))
        .replace("MM", &format!("{:02}", date.month()))
        .replace("DD", &format!("{:02}", date.day()))
        .replace("HH", &format!("{:02}", date.hour()))
        .replace("mm", &format!("{:02}", date.minute()))
        .replace("ss", &format!("{:02}", date.second()))
}

/// Calendar-aware shift. Months and years land on the closest valid day
/// of the target month (chrono clamps Jan 31 + 1 month to Feb 28/29).
pub fn add_to_date(date: DateTime<Utc>, amount: i64, unit: DateUnit) -> Result<DateTime<Utc>> {
    let shifted = match unit {
        DateUnit::Seconds => date.checked_add_signed(TimeDelta::seconds(amount)),
        DateUnit::Minutes => date.checked_add_signed(TimeDelta::minutes(amount)),
        DateUnit::Hours => date.checked_add_signed(TimeDelta::hours(amount)),
        DateUnit::Days => date.checked_add_signed(TimeDelta::days(amount)),
        DateUnit::Weeks => date.checked_add_signed(TimeDelta::weeks(amount)),
        DateUnit::Months => shift_months(date, amount),
        DateUnit::Years => shift_months(date, amount.checked_mul(12).unwrap_or(i64::MAX)),
    };
    shifted.ok_or_else(|| Error::Node("date arithmetic out of range".to_string()))
}

fn shift_months(date: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

/// Numeric extraction. Month is 1-indexed; dayOfWeek counts from
/// Sunday = 0.
pub fn extract_from_date(date: &DateTime<Utc>, part: DatePart) -> i64 {
    match part {
        DatePart::Year => i64::from(date.year()),
        DatePart::Month => i64::from(date.month()),
        DatePart::Day => i64::from(date.day()),
        DatePart::Hour => i64::from(date.hour()),
        DatePart::Minute => i64::from(date.minute()),
        DatePart::Second => i64::from(date.second()),
        DatePart::DayOfWeek => i64::from(date.weekday().num_days_from_sunday()),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:mm:ss`, or a bare `YYYY-MM-DD`.
/// The second element reports whether the input carried a time of day.
pub fn parse_date(text: &str) -> Result<(DateTime<Utc>, bool)> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok((parsed.with_timezone(&Utc), true));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok((naive.and_utc(), true));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok((naive.and_utc(), false));
        }
    }
    Err(Error::Node(format!("unparseable date: {text}")))
}

pub fn run(items: &[ExecutionItem], config: &DateTimeConfig) -> Result<Vec<ExecutionItem>> {
    items
        .iter()
        .map(|item| {
            let (base, had_time) = match &config.field {
                Some(field) => {
                    let value = get_nested_value(&item.to_value(), field)
                        .cloned()
                        .unwrap_or(Value::Null);
                    match value {
                        Value::String(text) => parse_date(&text)?,
                        other => {
                            return Err(Error::Node(format!(
                                "field {field} does not hold a date string: {other}"
                            )))
                        }
                    }
                }
                None => (Utc::now(), true),
            };

            let default_pattern = if had_time { FULL_PATTERN } else { DATE_PATTERN };
            let pattern = config.format.as_deref().unwrap_or(default_pattern);

            let result = match config.action {
                DateTimeAction::Now => Value::String(format_date(
                    &Utc::now(),
                    config.format.as_deref().unwrap_or(FULL_PATTERN),
                )),
                DateTimeAction::Format => Value::String(format_date(&base, pattern)),
                DateTimeAction::Add => {
                    Value::String(format_date(&add_to_date(base, config.amount, config.unit)?, pattern))
                }
                DateTimeAction::Subtract => Value::String(format_date(
                    &add_to_date(base, -config.amount, config.unit)?,
                    pattern,
                )),
                DateTimeAction::Extract => {
                    let part = config.part.ok_or_else(|| {
                        Error::Node("extract requires a date part".to_string())
                    })?;
                    Value::Number(extract_from_date(&base, part).into())
                }
            };

            let mut out = item.clone();
            set_nested_value(&mut out.json, &config.output_field, result);
            Ok(out)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::values_to_items;
    use serde_json::json;

    fn config(action: DateTimeAction) -> DateTimeConfig {
        DateTimeConfig {
            action,
            field: Some("when".into()),
            format: None,
            amount: 0,
            unit: DateUnit::Days,
            part: None,
            output_field: default_output_field(),
        }
    }

    #[test]
    fn test_add_ten_days() {
        let items = values_to_items(vec![json!({"when": "2024-01-15"})]);
        let mut cfg = config(DateTimeAction::Add);
        cfg.amount = 10;

        let out = run(&items, &cfg).unwrap();
        assert_eq!(out[0].json.get("date"), Some(&json!("2024-01-25")));
    }

    #[test]
    fn test_subtract_months_clamps_to_month_end() {
        let items = values_to_items(vec![json!({"when": "2024-03-31"})]);
        let mut cfg = config(DateTimeAction::Subtract);
        cfg.amount = 1;
        cfg.unit = DateUnit::Months;

        let out = run(&items, &cfg).unwrap();
        assert_eq!(out[0].json.get("date"), Some(&json!("2024-02-29")));
    }

    #[test]
    fn test_format_tokens() {
        let (date, _) = parse_date("2024-01-05 07:08:09").unwrap();
        assert_eq!(format_date(&date, "YYYY/MM/DD HH:mm:ss"), "2024/01/05 07:08:09");
        assert_eq!(format_date(&date, "DD.MM.YYYY"), "05.01.2024");
    }

    #[test]
    fn test_extract_parts() {
        let items = values_to_items(vec![json!({"when": "2024-01-15 13:45:30"})]);
        let mut cfg = config(DateTimeAction::Extract);
        cfg.part = Some(DatePart::Month);
        assert_eq!(
            run(&items, &cfg).unwrap()[0].json.get("date"),
            Some(&json!(1))
        );

        // 2024-01-15 was a Monday.
        cfg.part = Some(DatePart::DayOfWeek);
        assert_eq!(
            run(&items, &cfg).unwrap()[0].json.get("date"),
            Some(&json!(1))
        );
    }

    #[test]
    fn test_unparseable_date_is_a_node_error() {
        let items = values_to_items(vec![json!({"when": "tomorrow-ish"})]);
        assert!(run(&items, &config(DateTimeAction::Format)).is_err());
    }
}
