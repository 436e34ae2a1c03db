//! Upstream response models.
//!
//! These types mirror what the billing API returns. Fields are decoded
//! leniently: missing keys, `null`s and numbers-as-strings are accepted,
//! so a slightly malformed payload never fails a whole refresh cycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{lenient_id, lenient_string, null_as_default, to_float, to_int};

/// History item type code for a payment.
pub const PAYMENT_TYPE: i64 = 1;

/// An entry of the account list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    /// Numeric account id, used to fetch account info.
    pub id: i64,
    /// Account number, the stable key for everything else.
    pub number: String,
    /// Display name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Postal address.
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    /// Whether the smart-metering service is available (upstream spelling).
    #[serde(default, rename = "isueAvaliable", deserialize_with = "null_as_default")]
    pub isue_available: bool,
    /// First year with billing data.
    #[serde(default, rename = "initial_year")]
    pub initial_year: Option<i32>,
}

/// A single tariff reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// Tariff zone name (e.g. day / night).
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Reading value, usually a numeric string.
    #[serde(default)]
    pub value: Value,
    /// Reading date (`dd.mm.yy`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    /// Consumption since the previous reading, when reported.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub consumption: Value,
}

impl Reading {
    /// Creates a reading with a name, a value and a date.
    pub fn new(name: impl Into<String>, value: impl Into<Value>, date: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
            date: Some(date.into()),
            consumption: Value::Null,
        }
    }

    /// Builder-style method to set consumption.
    pub fn with_consumption(mut self, consumption: impl Into<Value>) -> Self {
        self.consumption = consumption.into();
        self
    }

    /// Returns the reading value as a number.
    pub fn value_f64(&self) -> Option<f64> {
        to_float(&self.value)
    }

    /// Returns the consumption as a number.
    pub fn consumption_f64(&self) -> Option<f64> {
        to_float(&self.consumption)
    }
}

/// A meter registered under an account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    /// Stable counter id (meter serial number).
    #[serde(default, deserialize_with = "lenient_id")]
    pub counter_id: Option<String>,
    /// Row id used when submitting new readings.
    #[serde(default, deserialize_with = "lenient_id")]
    pub row_id: Option<String>,
    /// Installation type.
    #[serde(default, deserialize_with = "lenient_string")]
    pub installation_type: Option<String>,
    /// Number of tariffs the counter bills.
    #[serde(default)]
    pub tariff: Value,
    /// Next verification date.
    #[serde(default, deserialize_with = "lenient_string")]
    pub checking_date: Option<String>,
    /// Most recent reading per tariff.
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_readings: Vec<Reading>,
}

impl Counter {
    /// Returns the declared tariff count, or zero when absent or malformed.
    pub fn tariff_count(&self) -> usize {
        to_int(&self.tariff)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }
}

/// One element of the counter readings response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CounterReadings {
    /// Per-tariff readings including consumption.
    #[serde(default, deserialize_with = "null_as_default")]
    pub readings: Vec<Reading>,
}

/// An item of the payment/charge history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Item type code; [`PAYMENT_TYPE`] marks a payment.
    #[serde(default, rename = "type")]
    pub kind: Value,
    /// Amount in roubles.
    #[serde(default)]
    pub amount: Value,
    /// Item date (`dd.mm.yy`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    /// Human readable description.
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

impl HistoryItem {
    /// Returns true if this item is a payment.
    pub fn is_payment(&self) -> bool {
        to_int(&self.kind) == Some(PAYMENT_TYPE)
    }
}

/// Payment history for one calendar month.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentHistory {
    /// History items in upstream order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<HistoryItem>,
}

impl PaymentHistory {
    /// Returns the first payment item, if any.
    pub fn first_payment(&self) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.is_payment())
    }
}

/// Invoice file response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Invoice {
    /// Base64-encoded PDF.
    #[serde(default, deserialize_with = "lenient_string")]
    pub file: Option<String>,
}
