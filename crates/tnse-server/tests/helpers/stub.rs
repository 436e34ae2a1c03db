//! Stub upstream for server tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tnse_core::{AccountSummary, Counter, CounterReadings, Invoice, PaymentHistory};
use tnse_sync::{ApiError, ApiResult, TnseApi};

pub const ACCOUNT: &str = "610000000001";

/// Upstream with one two-tariff account.
pub struct StubApi {
    pub invoice: Mutex<Invoice>,
    pub reject_auth: Mutex<bool>,
    pub sent: Mutex<Vec<Vec<String>>>,
}

impl StubApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            invoice: Mutex::new(Invoice::default()),
            reject_auth: Mutex::new(false),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn check(&self) -> ApiResult<()> {
        if *self.reject_auth.lock() {
            return Err(ApiError::auth("token revoked"));
        }
        Ok(())
    }
}

#[async_trait]
impl TnseApi for StubApi {
    fn access_token(&self) -> Option<String> {
        Some("stub-token".to_string())
    }

    async fn login(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn get_accounts(&self) -> ApiResult<Vec<AccountSummary>> {
        self.check()?;
        Ok(serde_json::from_value(json!([{ "id": 1, "number": ACCOUNT, "name": "Ivanov" }]))
            .unwrap_or_default())
    }

    async fn get_account_info(&self, _account_id: i64) -> ApiResult<Map<String, Value>> {
        self.check()?;
        Ok(json!({ "phone": "+70000000000" })
            .as_object()
            .cloned()
            .unwrap_or_default())
    }

    async fn get_balance(&self, _account: &str) -> ApiResult<Map<String, Value>> {
        self.check()?;
        Ok(json!({ "sumToPay": 812.4, "debt": 0 })
            .as_object()
            .cloned()
            .unwrap_or_default())
    }

    async fn get_counters(&self, _account: &str) -> ApiResult<Vec<Counter>> {
        self.check()?;
        Ok(serde_json::from_value(json!([{
            "counterId": "10000001",
            "rowId": "2000001",
            "tariff": 2,
            "lastReadings": [
                {"name": "Day", "value": "3500", "date": "24.01.26"},
                {"name": "Night", "value": "1500", "date": "24.01.26"}
            ]
        }]))
        .unwrap_or_default())
    }

    async fn get_counter_readings(
        &self,
        _counter_id: &str,
        _account: &str,
    ) -> ApiResult<Vec<CounterReadings>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn get_history(&self, _account: &str, _year: i32, _month: u32) -> ApiResult<PaymentHistory> {
        self.check()?;
        Ok(PaymentHistory::default())
    }

    async fn send_readings(
        &self,
        _account: &str,
        _row_id: &str,
        readings: &[String],
    ) -> ApiResult<Value> {
        self.check()?;
        self.sent.lock().push(readings.to_vec());
        Ok(json!({ "sumToPay": 0 }))
    }

    async fn get_invoice_file(&self, _account: &str, _date: &str) -> ApiResult<Invoice> {
        self.check()?;
        Ok(self.invoice.lock().clone())
    }
}
