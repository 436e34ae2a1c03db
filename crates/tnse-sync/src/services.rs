//! User-triggered service actions.
//!
//! Every call publishes a [`ServiceEvent`] named
//! `tns_energo_<service>_completed` or `tns_energo_<service>_failed`.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tnse_core::value::{DATE_FULL_YEAR, first_day_of_previous_month, to_float};
use tnse_core::{AccountSnapshot, Snapshot};
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::coordinator::RefreshCoordinator;
use crate::error::ServiceError;
use crate::registry::CoordinatorRegistry;

/// Event domain prefix.
pub const DOMAIN: &str = "tns_energo";

/// URL prefix under which saved bills are served.
pub const BILL_URL_PREFIX: &str = "/local/tns_energo";

const EVENT_CAPACITY: usize = 64;

/// Service action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Refresh,
    SendReadings,
    GetBill,
}

impl ServiceKind {
    /// Returns the service name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::SendReadings => "send_readings",
            Self::GetBill => "get_bill",
        }
    }
}

/// Event published after every service call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEvent {
    /// `tns_energo_<service>_completed` or `tns_energo_<service>_failed`.
    pub event_type: String,
    /// The service that ran.
    pub service: ServiceKind,
    /// Whether the call succeeded.
    pub success: bool,
    /// Call target plus the result, or the error text.
    pub data: Value,
}

/// Request to submit meter readings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendReadingsRequest {
    /// Account number.
    pub account: String,
    /// Counter id; defaults to the account's first counter.
    #[serde(default)]
    pub counter: Option<String>,
    /// One value per tariff, in tariff order.
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Result of a readings submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendReadingsResponse {
    /// The submitted values as integer strings.
    pub readings: Vec<String>,
    /// Upstream answer (updated balance).
    pub balance: Value,
}

/// Request to download a bill.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetBillRequest {
    /// Account number.
    pub account: String,
    /// Any day of the billing month; defaults to the previous month.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Result of a bill download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillResponse {
    /// The requested billing date.
    pub date: NaiveDate,
    /// Where the PDF was written.
    pub file_path: PathBuf,
    /// URL under which the PDF is served.
    pub url: String,
}

/// Executes service actions against registered coordinators.
#[derive(Debug)]
pub struct ServiceHandler {
    registry: Arc<CoordinatorRegistry>,
    bill_dir: PathBuf,
    events: broadcast::Sender<ServiceEvent>,
}

impl ServiceHandler {
    /// Creates a handler writing bills into `bill_dir`.
    pub fn new(registry: Arc<CoordinatorRegistry>, bill_dir: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry,
            bill_dir: bill_dir.into(),
            events,
        }
    }

    /// Returns the coordinator registry.
    pub fn registry(&self) -> &Arc<CoordinatorRegistry> {
        &self.registry
    }

    /// Subscribes to service events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    /// Runs one refresh cycle for an entry.
    pub async fn refresh(&self, entry_id: &str) -> Result<Arc<Snapshot>, ServiceError> {
        debug!("Service call {}", ServiceKind::Refresh.name());
        let result = self.refresh_inner(entry_id).await;

        let target = json!({ "entry_id": entry_id });
        self.publish(ServiceKind::Refresh, target, &result, |_| json!({}));
        result
    }

    /// Validates and submits meter readings.
    ///
    /// Validation happens before any network call: every tariff of the
    /// counter needs a numeric value, and no value may exceed the tariff count.
    pub async fn send_readings(
        &self,
        request: &SendReadingsRequest,
    ) -> Result<SendReadingsResponse, ServiceError> {
        debug!("Service call {}", ServiceKind::SendReadings.name());
        let result = self.send_readings_inner(request).await;

        let target = json!({ "account": request.account });
        self.publish(ServiceKind::SendReadings, target, &result, |r| {
            json!({ "readings": r.readings, "balance": r.balance })
        });
        result
    }

    /// Downloads a bill PDF into the bill directory.
    pub async fn get_bill(&self, request: &GetBillRequest) -> Result<BillResponse, ServiceError> {
        debug!("Service call {}", ServiceKind::GetBill.name());
        let result = self.get_bill_inner(request).await;

        let target = json!({ "account": request.account });
        self.publish(ServiceKind::GetBill, target, &result, |r| {
            json!({ "date": r.date, "file_path": r.file_path, "url": r.url })
        });
        result
    }

    async fn refresh_inner(&self, entry_id: &str) -> Result<Arc<Snapshot>, ServiceError> {
        let coordinator = self
            .registry
            .get(entry_id)
            .ok_or_else(|| ServiceError::EntryNotFound(entry_id.to_string()))?;
        Ok(coordinator.refresh().await?)
    }

    async fn send_readings_inner(
        &self,
        request: &SendReadingsRequest,
    ) -> Result<SendReadingsResponse, ServiceError> {
        let (coordinator, snapshot) = self.resolve(&request.account)?;
        let account = find_account(&snapshot, &request.account)?;

        let index = match request.counter.as_deref() {
            Some(id) => account.counter_index(id),
            None => (!account.counters.is_empty()).then_some(0),
        };
        let counter_not_found = || ServiceError::CounterNotFound {
            account: account.number.clone(),
            counter: request.counter.clone().unwrap_or_default(),
        };
        let counter = index
            .and_then(|i| account.counter(i))
            .ok_or_else(counter_not_found)?;
        let row_id = counter.row_id.as_deref().ok_or_else(counter_not_found)?;

        let readings = build_readings(&account.number, counter.tariff_count(), &request.values)?;
        let balance = coordinator
            .submit_readings(&account.number, row_id, &readings)
            .await?;

        Ok(SendReadingsResponse { readings, balance })
    }

    async fn get_bill_inner(&self, request: &GetBillRequest) -> Result<BillResponse, ServiceError> {
        let (coordinator, snapshot) = self.resolve(&request.account)?;
        let number = find_account(&snapshot, &request.account)?.number.clone();

        let date = request
            .date
            .unwrap_or_else(|| first_day_of_previous_month(Local::now().date_naive()));
        let invoice = coordinator
            .get_invoice(&number, &date.format(DATE_FULL_YEAR).to_string())
            .await?;

        let file = invoice.file.ok_or_else(|| ServiceError::NoFileInResponse {
            account: number.clone(),
        })?;
        let bytes = STANDARD
            .decode(file.trim())
            .map_err(|e| ServiceError::InvalidFile(e.to_string()))?;

        let filename = format!("{}_{}.pdf", number, date.format("%Y-%m"));
        let file_path = self.bill_dir.join(&filename);
        tokio::fs::create_dir_all(&self.bill_dir).await?;
        tokio::fs::write(&file_path, bytes).await?;

        Ok(BillResponse {
            date,
            file_path,
            url: format!("{}/{}", BILL_URL_PREFIX, filename),
        })
    }

    fn resolve(
        &self,
        account: &str,
    ) -> Result<(Arc<RefreshCoordinator>, Arc<Snapshot>), ServiceError> {
        let not_found = || ServiceError::AccountNotFound(account.to_string());
        let coordinator = self.registry.by_account(account).ok_or_else(not_found)?;
        let snapshot = coordinator.data().ok_or_else(not_found)?;
        Ok((coordinator, snapshot))
    }

    fn publish<T>(
        &self,
        kind: ServiceKind,
        target: Value,
        result: &Result<T, ServiceError>,
        render: impl FnOnce(&T) -> Value,
    ) {
        let mut data = target;
        let success = result.is_ok();

        let extra = match result {
            Ok(value) => {
                debug!("Service call '{}' successfully finished", kind.name());
                render(value)
            },
            Err(e) => {
                error!("Service call '{}' failed. Error: {}", kind.name(), e);
                json!({ "error": e.to_string() })
            },
        };
        if let (Value::Object(data), Value::Object(extra)) = (&mut data, extra) {
            data.extend(extra);
        }

        let outcome = if success { "completed" } else { "failed" };
        let event = ServiceEvent {
            event_type: format!("{}_{}_{}", DOMAIN, kind.name(), outcome),
            service: kind,
            success,
            data,
        };
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn find_account<'a>(snapshot: &'a Snapshot, number: &str) -> Result<&'a AccountSnapshot, ServiceError> {
    snapshot
        .account(number)
        .ok_or_else(|| ServiceError::AccountNotFound(number.to_string()))
}

/// Validates values against a counter's tariff count and normalizes them to
/// integer strings (fraction truncated).
pub fn build_readings(
    account: &str,
    tariff_count: usize,
    values: &[Value],
) -> Result<Vec<String>, ServiceError> {
    let mut readings = Vec::with_capacity(tariff_count);

    for i in 0..tariff_count {
        let value = values
            .get(i)
            .and_then(to_float)
            .ok_or_else(|| ServiceError::TariffMissing {
                account: account.to_string(),
                tariff: format!("T{}", i + 1),
                need: tariff_count,
            })?;
        readings.push((value.trunc() as i64).to_string());
    }

    if let Some(extra) = values
        .iter()
        .enumerate()
        .skip(tariff_count)
        .find(|(_, v)| !v.is_null())
        .map(|(i, _)| i)
    {
        return Err(ServiceError::TariffExtra {
            account: account.to_string(),
            tariff: format!("T{}", extra + 1),
            need: tariff_count,
        });
    }

    Ok(readings)
}
