//! Test helpers for tnse-sync.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tnse_core::entry::{CONF_EMAIL, CONF_PASSWORD, CONF_REGION};
use tnse_core::{
    AccountSummary, ConfigEntry, Counter, CounterReadings, CredentialState, Invoice,
    PaymentHistory, TokenSet,
};
use tnse_sync::{
    ApiError, ApiResult, ConfigStore, MemoryStore, RefreshCoordinator, RetryPolicy, TnseApi,
    TokenObserver,
};

pub const ENTRY_ID: &str = "entry-1";
pub const ACCOUNT: &str = "610000000001";
pub const COUNTER_ID: &str = "10000001";
pub const ROW_ID: &str = "2000001";

/// Failure kinds the mock can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fail {
    Auth,
    Api,
    Transport,
    Decode,
}

impl Fail {
    fn to_error(self, op: &str) -> ApiError {
        match self {
            Fail::Auth => ApiError::auth(format!("{} rejected", op)),
            Fail::Api => ApiError::api(format!("{} failed", op)),
            Fail::Transport => ApiError::transport(format!("{} unreachable", op)),
            Fail::Decode => ApiError::Decode(format!("{} returned garbage", op)),
        }
    }
}

/// Scriptable in-memory upstream.
pub struct MockApi {
    token: Mutex<Option<String>>,
    observer: Mutex<Option<Arc<dyn TokenObserver>>>,
    calls: Mutex<HashMap<String, usize>>,
    always: Mutex<HashMap<String, Fail>>,
    queued: Mutex<HashMap<String, VecDeque<Fail>>>,
    per_account: Mutex<HashMap<(String, String), Fail>>,
    pub sum_to_pay: Mutex<f64>,
    pub accounts: Mutex<Vec<AccountSummary>>,
    pub counters: Mutex<Vec<Counter>>,
    pub readings: Mutex<Vec<CounterReadings>>,
    pub history: Mutex<HashMap<(i32, u32), PaymentHistory>>,
    pub invoice: Mutex<Invoice>,
    pub sent: Mutex<Vec<(String, String, Vec<String>)>>,
}

impl MockApi {
    /// Creates a mock serving the fixture account.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(None),
            observer: Mutex::new(None),
            calls: Mutex::new(HashMap::new()),
            always: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            per_account: Mutex::new(HashMap::new()),
            sum_to_pay: Mutex::new(1500.5),
            accounts: Mutex::new(vec![summary(100001, ACCOUNT)]),
            counters: Mutex::new(vec![two_tariff_counter()]),
            readings: Mutex::new(readings_fixture()),
            history: Mutex::new(HashMap::new()),
            invoice: Mutex::new(Invoice::default()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Picks up saved tokens and the observer, as a real client would.
    pub fn attach(&self, credentials: CredentialState, observer: Arc<dyn TokenObserver>) {
        *self.token.lock() = credentials.tokens.access_token;
        *self.observer.lock() = Some(observer);
    }

    /// Makes every call of `op` fail.
    pub fn fail_always(&self, op: &str, fail: Fail) {
        self.always.lock().insert(op.to_string(), fail);
    }

    /// Makes the next `times` calls of `op` fail.
    pub fn fail_times(&self, op: &str, times: usize, fail: Fail) {
        let mut queued = self.queued.lock();
        let queue = queued.entry(op.to_string()).or_default();
        queue.extend(std::iter::repeat_n(fail, times));
    }

    /// Makes every call of `op` for one account number fail.
    pub fn fail_for_account(&self, op: &str, account: &str, fail: Fail) {
        self.per_account
            .lock()
            .insert((op.to_string(), account.to_string()), fail);
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        self.always.lock().clear();
        self.queued.lock().clear();
        self.per_account.lock().clear();
    }

    /// Returns how often `op` was called.
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().get(op).copied().unwrap_or(0)
    }

    pub fn set_history(&self, year: i32, month: u32, payload: Value) {
        let history: PaymentHistory = serde_json::from_value(payload).unwrap();
        self.history.lock().insert((year, month), history);
    }

    fn enter(&self, op: &str) -> ApiResult<()> {
        *self.calls.lock().entry(op.to_string()).or_default() += 1;

        if let Some(fail) = self.always.lock().get(op) {
            return Err(fail.to_error(op));
        }
        if let Some(fail) = self.queued.lock().get_mut(op).and_then(VecDeque::pop_front) {
            return Err(fail.to_error(op));
        }
        Ok(())
    }

    fn enter_for(&self, op: &str, account: &str) -> ApiResult<()> {
        self.enter(op)?;

        let key = (op.to_string(), account.to_string());
        if let Some(fail) = self.per_account.lock().get(&key) {
            return Err(fail.to_error(op));
        }
        Ok(())
    }
}

#[async_trait]
impl TnseApi for MockApi {
    fn access_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    async fn login(&self) -> ApiResult<()> {
        self.enter("login")?;

        let tokens = TokenSet {
            access_token: Some("fresh-access".to_string()),
            refresh_token: Some("fresh-refresh".to_string()),
            access_token_expires: tnse_core::credentials::parse_expires("2030-01-01T00:00:00"),
            refresh_token_expires: None,
        };
        *self.token.lock() = tokens.access_token.clone();

        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_tokens_refreshed(&tokens);
        }
        Ok(())
    }

    async fn get_accounts(&self) -> ApiResult<Vec<AccountSummary>> {
        self.enter("get_accounts")?;
        Ok(self.accounts.lock().clone())
    }

    async fn get_account_info(&self, account_id: i64) -> ApiResult<Map<String, Value>> {
        self.enter("get_account_info")?;
        Ok(json!({ "id": account_id, "phone": "+70000000000", "totalArea": 65 })
            .as_object()
            .cloned()
            .unwrap_or_default())
    }

    async fn get_balance(&self, account: &str) -> ApiResult<Map<String, Value>> {
        self.enter_for("get_balance", account)?;
        let sum_to_pay = *self.sum_to_pay.lock();
        Ok(json!({ "sumToPay": sum_to_pay, "debt": 0, "closedMonth": "01.02.26" })
            .as_object()
            .cloned()
            .unwrap_or_default())
    }

    async fn get_counters(&self, _account: &str) -> ApiResult<Vec<Counter>> {
        self.enter("get_counters")?;
        Ok(self.counters.lock().clone())
    }

    async fn get_counter_readings(
        &self,
        _counter_id: &str,
        _account: &str,
    ) -> ApiResult<Vec<CounterReadings>> {
        self.enter("get_counter_readings")?;
        Ok(self.readings.lock().clone())
    }

    async fn get_history(&self, _account: &str, year: i32, month: u32) -> ApiResult<PaymentHistory> {
        self.enter("get_history")?;
        Ok(self
            .history
            .lock()
            .get(&(year, month))
            .cloned()
            .unwrap_or_default())
    }

    async fn send_readings(
        &self,
        account: &str,
        row_id: &str,
        readings: &[String],
    ) -> ApiResult<Value> {
        self.enter("send_readings")?;
        self.sent
            .lock()
            .push((account.to_string(), row_id.to_string(), readings.to_vec()));
        Ok(json!({ "sumToPay": 900.0 }))
    }

    async fn get_invoice_file(&self, _account: &str, _date: &str) -> ApiResult<Invoice> {
        self.enter("get_invoice_file")?;
        Ok(self.invoice.lock().clone())
    }
}

pub fn summary(id: i64, number: &str) -> AccountSummary {
    serde_json::from_value(json!({ "id": id, "number": number, "address": "Primernaya st. 1" }))
        .unwrap()
}

pub fn two_tariff_counter() -> Counter {
    serde_json::from_value(json!({
        "counterId": COUNTER_ID,
        "rowId": ROW_ID,
        "tariff": 2,
        "lastReadings": [
            {"name": "Day", "value": "3500", "date": "24.01.26"},
            {"name": "Night", "value": "1500", "date": "24.01.26"}
        ]
    }))
    .unwrap()
}

pub fn readings_fixture() -> Vec<CounterReadings> {
    serde_json::from_value(json!([{
        "readings": [
            {"name": "Day", "value": "3500", "date": "24.01.26", "consumption": "120"},
            {"name": "Night", "value": "1500", "date": "24.01.26", "consumption": "60"}
        ]
    }]))
    .unwrap()
}

pub fn entry_data() -> Map<String, Value> {
    let mut data = Map::new();
    data.insert(CONF_REGION.into(), json!("rostov"));
    data.insert(CONF_EMAIL.into(), json!("user@example.com"));
    data.insert(CONF_PASSWORD.into(), json!("secret"));
    data
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(ConfigEntry::new(entry_data())).unwrap())
}

/// Retry policy without backoff delays.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(5), Duration::ZERO)
}

pub fn coordinator_with(
    entry_id: &str,
    api: &Arc<MockApi>,
    store: Arc<dyn ConfigStore>,
    retry: RetryPolicy,
) -> Arc<RefreshCoordinator> {
    let api = api.clone();
    let coordinator = RefreshCoordinator::new(entry_id, store, retry, move |credentials, observer| {
        api.attach(credentials, observer);
        let api: Arc<dyn TnseApi> = api;
        api
    })
    .unwrap();
    Arc::new(coordinator)
}

pub fn coordinator(api: &Arc<MockApi>) -> Arc<RefreshCoordinator> {
    coordinator_with(ENTRY_ID, api, memory_store(), fast_retry())
}

/// Polls `check` until it holds, for tokens persisted off the runtime.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
