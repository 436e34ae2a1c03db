#![allow(dead_code)]
use serde_json::{Value, json};
use tnse_core::{AccountSnapshot, AccountSummary, Counter, CounterReadings, PaymentHistory};

/// Account list payload with a single account.
pub fn accounts_payload() -> Value {
    json!([{
        "id": 100001,
        "number": "610000000001",
        "name": "",
        "address": "Rostov-on-Don, Primernaya st. 1",
        "isueAvaliable": false,
        "initial_year": 2020
    }])
}

/// Account info payload.
pub fn info_payload() -> Value {
    json!({
        "id": 100001,
        "number": "610000000001",
        "name": "",
        "phone": "",
        "numberPersons": 0,
        "totalArea": 65,
        "livingArea": 0,
        "document": "none",
        "seasonRatio": 0.9,
        "countersInfo": [
            {"number": "10000001", "place": "", "checkingDate": "01.01.2040"}
        ]
    })
}

/// Balance payload.
pub fn balance_payload() -> Value {
    json!({
        "sumToPayRaw": 1500.5,
        "debt": 0,
        "debtAbs": 0,
        "peniDebt": 0,
        "closedMonth": "01.02.26",
        "sumToPay": 1500.5,
        "avansTotal": 1500.5,
        "avansType": "avg",
        "recalc": 0,
        "odn": 0,
        "peniForecast": 0,
        "losses": 0,
        "otherServicesDebt": 0
    })
}

/// Counters payload with one two-tariff counter.
pub fn counters_payload() -> Value {
    json!([{
        "counterId": "10000001",
        "rowId": "2000001",
        "installationType": "",
        "tariff": 2,
        "checkingDate": "01.01.2040",
        "lastReadings": [
            {"name": "Day", "value": "3500", "date": "24.01.26"},
            {"name": "Night", "value": "1500", "date": "24.01.26"}
        ]
    }])
}

/// Counter readings payload with consumption.
pub fn readings_payload() -> Value {
    json!([{
        "readings": [
            {"name": "Day", "value": "3500", "date": "24.01.26", "consumption": "120"},
            {"name": "Night", "value": "1500", "date": "24.01.26", "consumption": "60"}
        ]
    }])
}

/// History payload with one payment.
pub fn history_payload() -> Value {
    json!({
        "items": [
            {"type": 1, "amount": 1200.0, "date": "15.01.26", "description": "Payment"}
        ]
    })
}

/// Builds a fully populated snapshot from the payload fixtures.
pub fn populated_account() -> AccountSnapshot {
    let summaries: Vec<AccountSummary> = serde_json::from_value(accounts_payload()).unwrap();
    let mut account = AccountSnapshot::from_summary(&summaries[0]);

    account.info = info_payload().as_object().cloned().unwrap();
    account.balance = balance_payload().as_object().cloned().unwrap();
    account.counters = serde_json::from_value::<Vec<Counter>>(counters_payload()).unwrap();

    let readings: Vec<CounterReadings> = serde_json::from_value(readings_payload()).unwrap();
    account
        .counter_consumption
        .insert("10000001".into(), readings[0].readings.clone());

    let history: PaymentHistory = serde_json::from_value(history_payload()).unwrap();
    let payment = history.first_payment().unwrap();
    account.last_payment_amount = payment.amount.as_f64();
    account.last_payment_date = payment.date.clone();

    account
}
