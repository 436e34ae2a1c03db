//! Mapping of account snapshots to sensor entities.
//!
//! Account-level sensors are a closed set; counter-level sensors add one
//! reading and one consumption sensor per tariff the counter reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::account::{AccountSnapshot, Snapshot};
use crate::value::{DATE_SHORT_YEAR, to_date, to_str};

/// Unit of monetary sensors.
pub const UNIT_RUB: &str = "RUB";
/// Unit of energy sensors.
pub const UNIT_KWH: &str = "kWh";

/// A sensor state value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Plain text.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Point in time.
    Timestamp(DateTime<Utc>),
}

/// Account-level sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountSensor {
    Account,
    Cost,
    CostDate,
    Debt,
    CurrentTimestamp,
    Penalty,
    AdvancePayment,
    Recalculation,
    CommonNeeds,
    PenaltyForecast,
    Losses,
    OtherServicesDebt,
    LastPayment,
    LastPaymentDate,
}

impl AccountSensor {
    /// All account sensors in display order.
    pub const ALL: [AccountSensor; 14] = [
        Self::Account,
        Self::Cost,
        Self::CostDate,
        Self::Debt,
        Self::CurrentTimestamp,
        Self::Penalty,
        Self::AdvancePayment,
        Self::Recalculation,
        Self::CommonNeeds,
        Self::PenaltyForecast,
        Self::Losses,
        Self::OtherServicesDebt,
        Self::LastPayment,
        Self::LastPaymentDate,
    ];

    /// Returns the sensor key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Cost => "cost",
            Self::CostDate => "cost_date",
            Self::Debt => "debt",
            Self::CurrentTimestamp => "current_timestamp",
            Self::Penalty => "penalty",
            Self::AdvancePayment => "advance_payment",
            Self::Recalculation => "recalculation",
            Self::CommonNeeds => "common_needs",
            Self::PenaltyForecast => "penalty_forecast",
            Self::Losses => "losses",
            Self::OtherServicesDebt => "other_services_debt",
            Self::LastPayment => "last_payment",
            Self::LastPaymentDate => "last_payment_date",
        }
    }

    /// Returns the balance field backing a monetary sensor.
    fn balance_field(self) -> Option<&'static str> {
        match self {
            Self::Cost => Some("sumToPay"),
            Self::Debt => Some("debt"),
            Self::Penalty => Some("peniDebt"),
            Self::AdvancePayment => Some("avansTotal"),
            Self::Recalculation => Some("recalc"),
            Self::CommonNeeds => Some("odn"),
            Self::PenaltyForecast => Some("peniForecast"),
            Self::Losses => Some("losses"),
            Self::OtherServicesDebt => Some("otherServicesDebt"),
            _ => None,
        }
    }

    /// Returns the unit of measurement.
    pub fn unit(self) -> Option<&'static str> {
        if self.balance_field().is_some() || self == Self::LastPayment {
            Some(UNIT_RUB)
        } else {
            None
        }
    }

    /// Returns true if the sensor has data to show.
    pub fn available(self, account: &AccountSnapshot) -> bool {
        match self {
            Self::Account | Self::CurrentTimestamp => true,
            Self::LastPayment | Self::LastPaymentDate => account.has_last_payment(),
            _ => account.has_balance(),
        }
    }

    /// Returns the current value.
    ///
    /// `last_update` is the completion time of the snapshot the account came from.
    pub fn value(
        self,
        account: &AccountSnapshot,
        last_update: Option<DateTime<Utc>>,
    ) -> Option<SensorValue> {
        if let Some(field) = self.balance_field() {
            return account.balance_number(field).map(SensorValue::Number);
        }

        match self {
            Self::Account => Some(SensorValue::Text(account.number.clone())),
            Self::CostDate => {
                to_date(account.closed_month(), DATE_SHORT_YEAR).map(SensorValue::Date)
            },
            Self::CurrentTimestamp => last_update.map(SensorValue::Timestamp),
            Self::LastPayment => account.last_payment_amount.map(SensorValue::Number),
            Self::LastPaymentDate => {
                to_date(account.last_payment_date.as_deref(), DATE_SHORT_YEAR)
                    .map(SensorValue::Date)
            },
            _ => None,
        }
    }

    /// Returns the extra state attributes.
    pub fn attributes(self, account: &AccountSnapshot) -> Map<String, Value> {
        let info = |key: &str| account.info.get(key).cloned().unwrap_or(Value::Null);
        let info_str = |key: &str| {
            account
                .info
                .get(key)
                .and_then(to_str)
                .map(Value::String)
                .unwrap_or(Value::Null)
        };
        let balance = |key: &str| account.balance.get(key).cloned().unwrap_or(Value::Null);

        let attrs = match self {
            Self::Account => json!({
                "address": info_str("address"),
                "phone": info_str("phone"),
                "number_persons": info("numberPersons"),
                "total_area": info("totalArea"),
                "living_area": info("livingArea"),
                "ownership_document": info_str("document"),
                "tenant_category": info_str("tenantCategory"),
                "season_ratio": info("seasonRatio"),
                "isue_available": account.isue_available,
                "initial_year": account.initial_year,
            }),
            Self::Cost => json!({
                "sum_raw": balance("sumToPayRaw"),
                "sum_without_extras": balance("sumWithoutCheckbox"),
                "sum_with_extras": balance("sumWithCheckbox"),
            }),
            Self::Debt => json!({ "debt_abs": balance("debtAbs") }),
            Self::AdvancePayment => json!({
                "advance_type": account
                    .balance
                    .get("avansType")
                    .and_then(to_str)
                    .map(Value::String)
                    .unwrap_or(Value::Null),
                "advance_main": balance("avansMain"),
            }),
            _ => return Map::new(),
        };

        match attrs {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Counter-level sensors. Tariff variants carry the 0-based reading index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterSensor {
    ReadingsDate,
    Meter,
    Reading(usize),
    Consumption(usize),
}

impl CounterSensor {
    /// Returns the sensors for a counter with the given number of tariffs.
    pub fn for_tariffs(tariff_count: usize) -> Vec<CounterSensor> {
        let mut sensors = vec![Self::ReadingsDate, Self::Meter];
        for i in 0..tariff_count {
            sensors.push(Self::Reading(i));
            sensors.push(Self::Consumption(i));
        }
        sensors
    }

    /// Returns the sensor key.
    ///
    /// Tariff keys are unprefixed for single-tariff counters and
    /// `t<n>_`-prefixed (1-based) otherwise.
    pub fn key(self, tariff_count: usize) -> String {
        match self {
            Self::ReadingsDate => "readings_date".to_string(),
            Self::Meter => "meter".to_string(),
            Self::Reading(i) => tariff_key(tariff_count, i, "reading"),
            Self::Consumption(i) => tariff_key(tariff_count, i, "consumption"),
        }
    }

    /// Returns the unit of measurement.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::Reading(_) | Self::Consumption(_) => Some(UNIT_KWH),
            _ => None,
        }
    }

    /// Returns true if the sensor has data to show.
    pub fn available(self, account: &AccountSnapshot, counter_index: usize) -> bool {
        match self {
            Self::ReadingsDate => !account.counter_readings(counter_index).is_empty(),
            Self::Meter => account.counter(counter_index).is_some(),
            Self::Reading(i) => account.counter_reading(counter_index, i).is_some(),
            Self::Consumption(i) => account.counter_consumption(counter_index, i).is_some(),
        }
    }

    /// Returns the current value.
    pub fn value(self, account: &AccountSnapshot, counter_index: usize) -> Option<SensorValue> {
        match self {
            Self::ReadingsDate => {
                let reading = account.counter_reading(counter_index, 0)?;
                to_date(reading.date.as_deref(), DATE_SHORT_YEAR).map(SensorValue::Date)
            },
            Self::Meter => account
                .counter_id(counter_index)
                .map(|id| SensorValue::Text(id.to_string())),
            Self::Reading(i) => account
                .counter_reading_value(counter_index, i)
                .map(SensorValue::Number),
            Self::Consumption(i) => account
                .counter_consumption(counter_index, i)
                .map(SensorValue::Number),
        }
    }

    /// Returns the extra state attributes.
    pub fn attributes(self, account: &AccountSnapshot, counter_index: usize) -> Map<String, Value> {
        let mut attrs = Map::new();
        match self {
            Self::Meter => {
                let Some(counter) = account.counter(counter_index) else {
                    return attrs;
                };
                attrs.insert(
                    "installation_type".into(),
                    counter
                        .installation_type
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                );
                attrs.insert(
                    "installation_place".into(),
                    account
                        .counter_place(counter_index)
                        .map(|p| Value::String(p.to_string()))
                        .unwrap_or(Value::Null),
                );
                attrs.insert("tariff".into(), counter.tariff.clone());
                attrs.insert(
                    "checking_date".into(),
                    counter
                        .checking_date
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null),
                );
            },
            Self::Reading(i) => {
                if let Some(reading) = account.counter_reading(counter_index, i) {
                    attrs.insert("tariff_name".into(), json!(reading.name));
                    attrs.insert("readings_date".into(), json!(reading.date));
                }
            },
            _ => {},
        }
        attrs
    }
}

fn tariff_key(tariff_count: usize, index: usize, key: &str) -> String {
    if tariff_count == 1 {
        key.to_string()
    } else {
        format!("t{}_{}", index + 1, key)
    }
}

/// Rendered state of one sensor entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    /// Stable entity id: `<account>_<key>` or `<counter>_<key>`.
    pub unique_id: String,
    /// Sensor key.
    pub key: String,
    /// Account number the sensor belongs to.
    pub account: String,
    /// Counter id for counter-level sensors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,
    /// Current value; `None` when unknown.
    pub value: Option<SensorValue>,
    /// Whether the sensor is available.
    pub available: bool,
    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    /// Extra state attributes.
    pub attributes: Map<String, Value>,
}

/// Renders every sensor of one account.
pub fn sensors_for(account: &AccountSnapshot, last_update: Option<DateTime<Utc>>) -> Vec<SensorState> {
    let mut states: Vec<SensorState> = AccountSensor::ALL
        .iter()
        .map(|sensor| SensorState {
            unique_id: format!("{}_{}", account.number, sensor.key()),
            key: sensor.key().to_string(),
            account: account.number.clone(),
            counter: None,
            value: sensor.value(account, last_update),
            available: sensor.available(account),
            unit: sensor.unit(),
            attributes: sensor.attributes(account),
        })
        .collect();

    for index in 0..account.counters.len() {
        let counter_id = account.counter_id(index).map(String::from);
        let owner = counter_id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", account.number, index));
        let tariff_count = account.counter_tariff_count(index);

        for sensor in CounterSensor::for_tariffs(tariff_count) {
            let key = sensor.key(tariff_count);
            states.push(SensorState {
                unique_id: format!("{}_{}", owner, key),
                key,
                account: account.number.clone(),
                counter: counter_id.clone(),
                value: sensor.value(account, index),
                available: sensor.available(account, index),
                unit: sensor.unit(),
                attributes: sensor.attributes(account, index),
            });
        }
    }

    states
}

/// Renders every sensor of every account in a snapshot.
pub fn snapshot_sensors(snapshot: &Snapshot) -> Vec<SensorState> {
    snapshot
        .accounts
        .iter()
        .flat_map(|account| sensors_for(account, Some(snapshot.completed_at)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Counter, Reading};

    fn account() -> AccountSnapshot {
        let mut account = AccountSnapshot::new(100001, "610000000001");
        account.counters = vec![Counter {
            counter_id: Some("10000001".into()),
            row_id: Some("2000001".into()),
            tariff: json!(2),
            checking_date: Some("01.01.2040".into()),
            last_readings: vec![
                Reading::new("Day", "3500", "24.01.26"),
                Reading::new("Night", "1500", "24.01.26"),
            ],
            ..Counter::default()
        }];
        account
    }

    fn find<'a>(states: &'a [SensorState], unique_id: &str) -> &'a SensorState {
        states
            .iter()
            .find(|s| s.unique_id == unique_id)
            .unwrap_or_else(|| panic!("sensor {} not found", unique_id))
    }

    #[test]
    fn test_tariff_key_naming() {
        assert_eq!(CounterSensor::Reading(0).key(1), "reading");
        assert_eq!(CounterSensor::Consumption(0).key(1), "consumption");
        assert_eq!(CounterSensor::Reading(0).key(2), "t1_reading");
        assert_eq!(CounterSensor::Consumption(1).key(2), "t2_consumption");
    }

    #[test]
    fn test_balance_sensors_unavailable_without_balance() {
        let account = account();

        assert!(AccountSensor::Account.available(&account));
        assert!(!AccountSensor::Cost.available(&account));
        assert!(!AccountSensor::CostDate.available(&account));
        assert!(!AccountSensor::LastPayment.available(&account));
        assert_eq!(AccountSensor::Cost.value(&account, None), None);
    }

    #[test]
    fn test_balance_sensor_values() {
        let mut account = account();
        account.balance.insert("sumToPay".into(), json!(1500.5));
        account.balance.insert("debt".into(), json!(0));
        account.balance.insert("closedMonth".into(), json!("01.02.26"));

        assert_eq!(
            AccountSensor::Cost.value(&account, None),
            Some(SensorValue::Number(1500.5))
        );
        assert_eq!(
            AccountSensor::Debt.value(&account, None),
            Some(SensorValue::Number(0.0))
        );
        assert_eq!(
            AccountSensor::CostDate.value(&account, None),
            NaiveDate::from_ymd_opt(2026, 2, 1).map(SensorValue::Date)
        );
        assert_eq!(AccountSensor::Cost.unit(), Some(UNIT_RUB));
        assert_eq!(AccountSensor::CostDate.unit(), None);
    }

    #[test]
    fn test_last_payment_sensors() {
        let mut account = account();
        account.last_payment_amount = Some(1200.0);
        account.last_payment_date = Some("15.01.26".into());

        assert!(AccountSensor::LastPaymentDate.available(&account));
        assert_eq!(
            AccountSensor::LastPayment.value(&account, None),
            Some(SensorValue::Number(1200.0))
        );
        assert_eq!(
            AccountSensor::LastPaymentDate.value(&account, None),
            NaiveDate::from_ymd_opt(2026, 1, 15).map(SensorValue::Date)
        );
    }

    #[test]
    fn test_sensors_for_two_tariff_counter() {
        let states = sensors_for(&account(), None);

        assert_eq!(states.len(), AccountSensor::ALL.len() + 6);
        assert_eq!(
            find(&states, "610000000001_account").value,
            Some(SensorValue::Text("610000000001".into()))
        );
        assert_eq!(
            find(&states, "10000001_meter").value,
            Some(SensorValue::Text("10000001".into()))
        );
        assert_eq!(
            find(&states, "10000001_t1_reading").value,
            Some(SensorValue::Number(3500.0))
        );
        assert_eq!(
            find(&states, "10000001_t2_reading").value,
            Some(SensorValue::Number(1500.0))
        );

        let consumption = find(&states, "10000001_t1_consumption");
        assert!(!consumption.available);
        assert_eq!(consumption.value, None);
    }

    #[test]
    fn test_meter_attributes() {
        let mut account = account();
        account.info.insert(
            "countersInfo".into(),
            json!([{"number": "10000001", "place": "Hallway"}]),
        );

        let attrs = CounterSensor::Meter.attributes(&account, 0);
        assert_eq!(attrs["installation_place"], json!("Hallway"));
        assert_eq!(attrs["tariff"], json!(2));
        assert_eq!(attrs["checking_date"], json!("01.01.2040"));

        assert!(CounterSensor::Meter.attributes(&account, 4).is_empty());
    }

    #[test]
    fn test_sensor_value_serializes_untagged() {
        assert_eq!(
            serde_json::to_value(SensorValue::Number(1.5)).unwrap(),
            json!(1.5)
        );
        assert_eq!(
            serde_json::to_value(SensorValue::Date(
                NaiveDate::from_ymd_opt(2026, 1, 24).unwrap()
            ))
            .unwrap(),
            json!("2026-01-24")
        );
    }
}
