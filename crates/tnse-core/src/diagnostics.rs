//! Redacted diagnostics dump.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::account::{AccountSnapshot, Snapshot};
use crate::entry::{
    CONF_ACCESS_TOKEN, CONF_ACCESS_TOKEN_EXPIRES, CONF_EMAIL, CONF_PASSWORD, CONF_REFRESH_TOKEN,
    CONF_REFRESH_TOKEN_EXPIRES,
};

/// Replacement for redacted values.
pub const REDACTED: &str = "**REDACTED**";

/// Config entry keys that never leave the process unredacted.
pub const TO_REDACT_CONFIG: &[&str] = &[
    CONF_EMAIL,
    CONF_PASSWORD,
    CONF_ACCESS_TOKEN,
    CONF_REFRESH_TOKEN,
    CONF_ACCESS_TOKEN_EXPIRES,
    CONF_REFRESH_TOKEN_EXPIRES,
];

/// Account data keys holding personal information.
pub const TO_REDACT_DATA: &[&str] = &["phone", "name"];

/// Coordinator status included in the dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorStatus {
    /// Completion time of the last successful cycle.
    pub last_update_time: Option<DateTime<Utc>>,
    /// Whether the last cycle succeeded.
    pub last_update_success: bool,
    /// Region selector.
    pub region: String,
}

/// Recursively replaces the values of `keys` with [`REDACTED`].
///
/// `null` and empty-string values are left as they are.
pub fn redact(value: &Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_map(map, keys)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, keys)).collect()),
        other => other.clone(),
    }
}

/// Map variant of [`redact`].
pub fn redact_map(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let redacted = match value {
                Value::Null => Value::Null,
                Value::String(s) if s.is_empty() => value.clone(),
                _ if keys.contains(&key.as_str()) => Value::String(REDACTED.to_string()),
                _ => redact(value, keys),
            };
            (key.clone(), redacted)
        })
        .collect()
}

fn account_dump(account: &AccountSnapshot) -> Value {
    let dump = json!({
        "id": account.id,
        "number": account.number,
        "address": account.address,
        "info": account.info,
        "balance": account.balance,
        "counters": account.counters,
        "counter_consumption": account.counter_consumption,
        "last_payment_amount": account.last_payment_amount,
        "last_payment_date": account.last_payment_date,
    });
    redact(&dump, TO_REDACT_DATA)
}

/// Builds the diagnostics dump for one config entry.
pub fn entry_diagnostics(
    entry_data: &Map<String, Value>,
    snapshot: Option<&Snapshot>,
    status: &CoordinatorStatus,
) -> Value {
    let accounts: Vec<Value> = snapshot
        .map(|s| s.accounts.iter().map(account_dump).collect())
        .unwrap_or_default();

    json!({
        "config_entry": redact_map(entry_data, TO_REDACT_CONFIG),
        "coordinator": {
            "last_update_time": status.last_update_time,
            "last_update_success": status.last_update_success,
            "region": status.region,
            "accounts": accounts,
        },
    })
}
