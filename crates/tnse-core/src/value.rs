//! Defensive coercion of upstream JSON values.
//!
//! The billing API is loose about types: the same field may arrive as a
//! number, a numeric string or not at all. Every helper here returns
//! `None` instead of failing when the value cannot be interpreted.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Short date format used by the API (`24.01.26`).
pub const DATE_SHORT_YEAR: &str = "%d.%m.%y";

/// Full date format used by the API (`01.01.2040`).
pub const DATE_FULL_YEAR: &str = "%d.%m.%Y";

/// Converts a value to `f64`.
///
/// Accepts JSON numbers and strings holding a number. Anything else,
/// including non-finite results, yields `None`.
pub fn to_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Converts a value to `i64`, truncating fractional numbers.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Converts a value to its display string. `null` yields `None`.
pub fn to_str(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Parses a date string with the given `chrono` format.
pub fn to_date(value: Option<&str>, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?, fmt).ok()
}

/// Returns the first day of the month preceding `today`.
pub fn first_day_of_previous_month(today: NaiveDate) -> NaiveDate {
    let (year, month) = previous_month(today.year(), today.month());
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/// Returns the current and the previous calendar month as `(year, month)`.
pub fn month_window(today: NaiveDate) -> [(i32, u32); 2] {
    let current = (today.year(), today.month());
    [current, previous_month(current.0, current.1)]
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Deserializes an optional identifier that may be encoded as a string or a number.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserializes an optional string, tolerating numbers and other scalars.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(to_str))
}

/// Deserializes `null` as the type's default value.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
