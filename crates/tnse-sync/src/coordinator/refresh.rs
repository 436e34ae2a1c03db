//! The refresh coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDate, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tnse_core::value::{month_window, to_float};
use tnse_core::{
    AccountSnapshot, CoordinatorStatus, CredentialState, Invoice, Snapshot, entry_diagnostics,
};
use tracing::{debug, info, warn};

use super::{CoordinatorState, CredentialSink, SyncState};
use crate::api::{TnseApi, TokenObserver};
use crate::error::{ApiError, RefreshError, StoreError};
use crate::retry::RetryPolicy;
use crate::store::ConfigStore;

/// Owns the API client for one config entry and produces snapshots.
///
/// At most one cycle runs at a time; concurrent [`refresh`](Self::refresh)
/// calls queue on an async mutex. A failed cycle never replaces the
/// published snapshot.
pub struct RefreshCoordinator {
    entry_id: String,
    region: String,
    scan_interval: Duration,
    reauth_flagged: bool,
    api: Arc<dyn TnseApi>,
    store: Arc<dyn ConfigStore>,
    retry: RetryPolicy,
    state: RwLock<CoordinatorState>,
    sync: SyncState,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    cycle: tokio::sync::Mutex<()>,
}

impl RefreshCoordinator {
    /// Creates a coordinator for the entry held by `store`.
    ///
    /// Credentials are read once here and handed to `connect`, together with
    /// the observer that persists refreshed tokens, to build the API client.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be loaded or holds invalid credentials or options.
    pub fn new<F>(
        entry_id: impl Into<String>,
        store: Arc<dyn ConfigStore>,
        retry: RetryPolicy,
        connect: F,
    ) -> Result<Self, StoreError>
    where
        F: FnOnce(CredentialState, Arc<dyn TokenObserver>) -> Arc<dyn TnseApi>,
    {
        let entry_id = entry_id.into();
        let entry = store.load()?;
        let credentials = CredentialState::from_entry(&entry)?;
        let scan_interval = Duration::from_secs(entry.scan_interval_hours()? * 3600);
        let region = credentials.region.clone();

        let sink: Arc<dyn TokenObserver> =
            Arc::new(CredentialSink::new(entry_id.clone(), store.clone()));
        let api = connect(credentials, sink);

        Ok(Self {
            entry_id,
            region,
            scan_interval,
            reauth_flagged: entry.reauth_required,
            api,
            store,
            retry,
            state: RwLock::new(CoordinatorState::Uninitialized),
            sync: SyncState::new(),
            snapshot: RwLock::new(None),
            cycle: tokio::sync::Mutex::new(()),
        })
    }

    /// Returns the config entry id.
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Returns the region selector.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the configured refresh interval.
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    /// Returns the refresh bookkeeping.
    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    /// Returns the latest published snapshot.
    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().clone()
    }

    /// Returns the completion time of the last successful cycle.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.sync.last_refresh()
    }

    /// Returns true if the most recent cycle succeeded.
    pub fn last_update_success(&self) -> bool {
        self.sync.last_update_success()
    }

    /// Returns true if the latest snapshot contains the account.
    pub fn has_account(&self, number: &str) -> bool {
        self.snapshot
            .read()
            .as_ref()
            .is_some_and(|s| s.contains(number))
    }

    /// Returns the coordinator status for diagnostics.
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            last_update_time: self.last_update_time(),
            last_update_success: self.last_update_success(),
            region: self.region.clone(),
        }
    }

    /// Returns the redacted diagnostics dump.
    pub fn diagnostics(&self) -> Result<Value, StoreError> {
        let entry = self.store.load()?;
        let snapshot = self.data();
        Ok(entry_diagnostics(
            &entry.data,
            snapshot.as_deref(),
            &self.status(),
        ))
    }

    /// Authenticates the client.
    ///
    /// Skips login when the client already holds an access token.
    ///
    /// # Errors
    ///
    /// - [`RefreshError::ReauthRequired`] if the entry is flagged or login is rejected
    /// - [`RefreshError::SetupRetry`] if login failed for any other reason
    pub async fn setup(&self) -> Result<(), RefreshError> {
        let _cycle = self.cycle.lock().await;
        self.setup_locked().await
    }

    /// Runs setup followed by the first cycle.
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        self.setup().await?;
        self.refresh().await
    }

    /// Runs one refresh cycle and publishes its snapshot.
    ///
    /// Runs setup first if the coordinator is not set up yet. Does nothing
    /// and fails with [`RefreshError::ReauthRequired`] once credentials were
    /// rejected.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let _cycle = self.cycle.lock().await;

        match self.state() {
            CoordinatorState::AuthFailed => {
                return Err(RefreshError::ReauthRequired(
                    "credentials were rejected".to_string(),
                ));
            },
            CoordinatorState::Uninitialized | CoordinatorState::SetupRetry => {
                self.setup_locked().await?;
            },
            CoordinatorState::Ready | CoordinatorState::Refreshing => {},
        }

        self.run_cycle().await
    }

    /// Submits meter readings through the retry policy.
    pub async fn submit_readings(
        &self,
        account: &str,
        row_id: &str,
        readings: &[String],
    ) -> Result<Value, RefreshError> {
        self.ensure_not_auth_failed()?;
        self.retry
            .run("send_readings", || {
                self.api.send_readings(account, row_id, readings)
            })
            .await
            .map_err(|e| self.map_api_error(e))
    }

    /// Fetches an invoice through the retry policy. `date` is `dd.mm.YYYY`.
    pub async fn get_invoice(&self, account: &str, date: &str) -> Result<Invoice, RefreshError> {
        self.ensure_not_auth_failed()?;
        self.retry
            .run("get_invoice_file", || self.api.get_invoice_file(account, date))
            .await
            .map_err(|e| self.map_api_error(e))
    }

    async fn setup_locked(&self) -> Result<(), RefreshError> {
        if self.reauth_flagged {
            self.set_state(CoordinatorState::AuthFailed);
            let err = RefreshError::ReauthRequired(
                "config entry requires re-authentication".to_string(),
            );
            self.sync.record_failure(err.to_string());
            return Err(err);
        }

        if self.api.access_token().is_some() {
            debug!("Using saved access token, skipping login");
            self.set_state(CoordinatorState::Ready);
            return Ok(());
        }

        debug!("No saved token, logging in");
        match self.api.login().await {
            Ok(()) => {
                self.set_state(CoordinatorState::Ready);
                Ok(())
            },
            Err(e) if e.is_auth() => {
                warn!("Authentication failed for {}: {}", self.entry_id, e);
                self.set_state(CoordinatorState::AuthFailed);
                self.sync.record_failure(e.to_string());
                Err(RefreshError::ReauthRequired(e.to_string()))
            },
            Err(e) => {
                warn!("Setup failed for {}: {}", self.entry_id, e);
                self.set_state(CoordinatorState::SetupRetry);
                self.sync.record_failure(e.to_string());
                Err(RefreshError::SetupRetry(e.to_string()))
            },
        }
    }

    async fn run_cycle(&self) -> Result<Arc<Snapshot>, RefreshError> {
        self.set_state(CoordinatorState::Refreshing);
        let _guard = CycleGuard { state: &self.state };
        let started = Instant::now();

        let result = self.fetch_all(Local::now().date_naive()).await;
        metrics::histogram!("tnse_refresh_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(accounts) => {
                let snapshot = Arc::new(Snapshot::new(accounts, Utc::now()));
                *self.snapshot.write() = Some(snapshot.clone());
                self.sync.record_success(snapshot.completed_at);
                self.set_state(CoordinatorState::Ready);
                metrics::counter!("tnse_refresh_total", "outcome" => "success").increment(1);

                info!(
                    "Refreshed {} account(s) for {}",
                    snapshot.len(),
                    self.entry_id
                );
                Ok(snapshot)
            },
            Err(e) => {
                let err = self.map_api_error(e);
                let outcome = if err.is_reauth() {
                    "auth_failed"
                } else {
                    self.set_state(CoordinatorState::Ready);
                    "failed"
                };
                self.sync.record_failure(err.to_string());
                metrics::counter!("tnse_refresh_total", "outcome" => outcome).increment(1);

                warn!("Refresh failed for {}: {}", self.entry_id, err);
                Err(err)
            },
        }
    }

    async fn fetch_all(&self, today: NaiveDate) -> Result<Vec<AccountSnapshot>, ApiError> {
        let summaries = self
            .retry
            .run("get_accounts", || self.api.get_accounts())
            .await?;
        debug!("Fetched {} account(s)", summaries.len());

        let mut accounts = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let number = summary.number.clone();
            let mut account = AccountSnapshot::from_summary(summary);
            debug!("Fetching data for account {}", number);

            account.info = self
                .retry
                .run("get_account_info", || self.api.get_account_info(summary.id))
                .await?;
            account.balance = self
                .retry
                .run("get_balance", || self.api.get_balance(&number))
                .await?;
            account.counters = self
                .retry
                .run("get_counters", || self.api.get_counters(&number))
                .await?;

            account.counter_consumption = self.fetch_consumption(&account).await?;
            self.fetch_last_payment(&mut account, today).await?;

            debug!(
                "Account {}: balance={:?}, counters={}, consumption={}, last_payment={:?}",
                number,
                account.sum_to_pay(),
                account.counters.len(),
                account.counter_consumption.len(),
                account.last_payment_amount
            );
            accounts.push(account);
        }

        Ok(accounts)
    }

    /// Non-critical: failures other than auth are logged and skipped.
    async fn fetch_consumption(
        &self,
        account: &AccountSnapshot,
    ) -> Result<IndexMap<String, Vec<tnse_core::Reading>>, ApiError> {
        let mut consumption = IndexMap::new();

        for counter in &account.counters {
            let Some(counter_id) = counter.counter_id.as_deref() else {
                continue;
            };

            let result = self
                .retry
                .run("get_counter_readings", || {
                    self.api.get_counter_readings(counter_id, &account.number)
                })
                .await;

            match result {
                Ok(list) => {
                    if let Some(first) = list.into_iter().next() {
                        consumption.insert(counter_id.to_string(), first.readings);
                    }
                },
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!(
                    "Account {}: failed to fetch counter {} readings: {}",
                    account.number, counter_id, e
                ),
            }
        }

        Ok(consumption)
    }

    /// Non-critical: looks at the current, then the previous calendar month.
    async fn fetch_last_payment(
        &self,
        account: &mut AccountSnapshot,
        today: NaiveDate,
    ) -> Result<(), ApiError> {
        for (year, month) in month_window(today) {
            let number = account.number.as_str();
            let result = self
                .retry
                .run("get_history", || self.api.get_history(number, year, month))
                .await;

            match result {
                Ok(history) => {
                    if let Some(payment) = history.first_payment() {
                        account.last_payment_amount = to_float(&payment.amount);
                        account.last_payment_date = payment.date.clone();
                        return Ok(());
                    }
                },
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!(
                    "Account {}: failed to fetch history {}-{:02}: {}",
                    account.number, year, month, e
                ),
            }
        }

        Ok(())
    }

    fn ensure_not_auth_failed(&self) -> Result<(), RefreshError> {
        if self.state() == CoordinatorState::AuthFailed {
            return Err(RefreshError::ReauthRequired(
                "credentials were rejected".to_string(),
            ));
        }
        Ok(())
    }

    fn map_api_error(&self, err: ApiError) -> RefreshError {
        let mapped = RefreshError::from(err);
        if mapped.is_reauth() {
            self.set_state(CoordinatorState::AuthFailed);
        }
        mapped
    }

    fn set_state(&self, state: CoordinatorState) {
        let mut current = self.state.write();
        if *current != state {
            debug!("Coordinator {}: {} -> {}", self.entry_id, *current, state);
            *current = state;
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("entry_id", &self.entry_id)
            .field("region", &self.region)
            .field("state", &self.state())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Puts a cycle that was dropped mid-flight back to `Ready`.
struct CycleGuard<'a> {
    state: &'a RwLock<CoordinatorState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.write();
        if *state == CoordinatorState::Refreshing {
            *state = CoordinatorState::Ready;
        }
    }
}
