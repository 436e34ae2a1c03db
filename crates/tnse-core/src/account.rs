//! Per-account data snapshot.
//!
//! An [`AccountSnapshot`] is rebuilt from scratch on every refresh cycle
//! and published as part of an immutable [`Snapshot`]. All accessors are
//! index based and return `None` for out-of-range indexes or malformed
//! upstream data instead of panicking.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{AccountSummary, Counter, Reading};
use crate::value::to_float;

/// Parsed data for a single billing account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Numeric account id.
    pub id: i64,
    /// Account number (stable key).
    pub number: String,
    /// Display name.
    pub name: String,
    /// Postal address.
    pub address: String,
    /// Whether the smart-metering service is available.
    pub isue_available: bool,
    /// First year with billing data.
    pub initial_year: Option<i32>,
    /// Free-form account metadata.
    pub info: Map<String, Value>,
    /// Free-form monetary fields.
    pub balance: Map<String, Value>,
    /// Counters in upstream order.
    pub counters: Vec<Counter>,
    /// Per-counter consumption readings keyed by counter id.
    pub counter_consumption: IndexMap<String, Vec<Reading>>,
    /// Amount of the most recent payment.
    pub last_payment_amount: Option<f64>,
    /// Date of the most recent payment (`dd.mm.yy`).
    pub last_payment_date: Option<String>,
}

impl AccountSnapshot {
    /// Creates an empty snapshot for the given account id and number.
    pub fn new(id: i64, number: impl Into<String>) -> Self {
        Self {
            id,
            number: number.into(),
            ..Self::default()
        }
    }

    /// Creates an empty snapshot from an account list entry.
    pub fn from_summary(summary: &AccountSummary) -> Self {
        Self {
            id: summary.id,
            number: summary.number.clone(),
            name: summary.name.clone().unwrap_or_default(),
            address: summary.address.clone().unwrap_or_default(),
            isue_available: summary.isue_available,
            initial_year: summary.initial_year,
            ..Self::default()
        }
    }

    /// Returns true if balance data is present.
    pub fn has_balance(&self) -> bool {
        !self.balance.is_empty()
    }

    /// Returns true if last payment data is present.
    pub fn has_last_payment(&self) -> bool {
        self.last_payment_amount.is_some()
    }

    /// Returns the amount due.
    pub fn sum_to_pay(&self) -> Option<f64> {
        self.balance_number("sumToPay")
    }

    /// Returns the debt.
    pub fn debt(&self) -> Option<f64> {
        self.balance_number("debt")
    }

    /// Returns the closed billing month (`dd.mm.yy`).
    pub fn closed_month(&self) -> Option<&str> {
        self.balance.get("closedMonth").and_then(Value::as_str)
    }

    /// Returns a numeric balance field.
    pub fn balance_number(&self, key: &str) -> Option<f64> {
        self.balance.get(key).and_then(to_float)
    }

    /// Returns a counter by index.
    pub fn counter(&self, index: usize) -> Option<&Counter> {
        self.counters.get(index)
    }

    /// Returns the index of the counter with the given id.
    pub fn counter_index(&self, counter_id: &str) -> Option<usize> {
        self.counters
            .iter()
            .position(|c| c.counter_id.as_deref() == Some(counter_id))
    }

    /// Returns a counter's id by index.
    pub fn counter_id(&self, index: usize) -> Option<&str> {
        self.counter(index)?.counter_id.as_deref()
    }

    /// Returns a counter's row id by index.
    pub fn counter_row_id(&self, index: usize) -> Option<&str> {
        self.counter(index)?.row_id.as_deref()
    }

    /// Returns the last readings of a counter; empty when the counter is unknown.
    pub fn counter_readings(&self, index: usize) -> &[Reading] {
        self.counter(index)
            .map(|c| c.last_readings.as_slice())
            .unwrap_or_default()
    }

    /// Returns the number of tariff readings a counter carries.
    pub fn counter_tariff_count(&self, index: usize) -> usize {
        self.counter_readings(index).len()
    }

    /// Returns a single reading by counter and reading index.
    pub fn counter_reading(&self, counter_index: usize, reading_index: usize) -> Option<&Reading> {
        self.counter_readings(counter_index).get(reading_index)
    }

    /// Returns a reading value as a number.
    pub fn counter_reading_value(&self, counter_index: usize, reading_index: usize) -> Option<f64> {
        self.counter_reading(counter_index, reading_index)?
            .value_f64()
    }

    /// Returns the installation place recorded in account info for a counter.
    pub fn counter_place(&self, index: usize) -> Option<&str> {
        let counter_id = self.counter_id(index)?;
        self.info
            .get("countersInfo")?
            .as_array()?
            .iter()
            .find(|ci| ci.get("number").and_then(Value::as_str) == Some(counter_id))?
            .get("place")
            .and_then(Value::as_str)
            .filter(|place| !place.is_empty())
    }

    /// Returns consumption for a counter tariff.
    pub fn counter_consumption(&self, counter_index: usize, reading_index: usize) -> Option<f64> {
        let counter_id = self.counter_id(counter_index)?;
        self.counter_consumption
            .get(counter_id)?
            .get(reading_index)?
            .consumption_f64()
    }
}

/// The data published by one successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Accounts in upstream order.
    pub accounts: Vec<AccountSnapshot>,
    /// Wall-clock completion time of the cycle.
    pub completed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Creates a snapshot completed at the given time.
    pub fn new(accounts: Vec<AccountSnapshot>, completed_at: DateTime<Utc>) -> Self {
        Self {
            accounts,
            completed_at,
        }
    }

    /// Returns the account with the given number.
    pub fn account(&self, number: &str) -> Option<&AccountSnapshot> {
        self.accounts.iter().find(|a| a.number == number)
    }

    /// Returns true if the snapshot contains the given account number.
    pub fn contains(&self, number: &str) -> bool {
        self.account(number).is_some()
    }

    /// Returns the number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
