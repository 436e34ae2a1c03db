//! Upstream API trait definitions.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tnse_core::{AccountSummary, Counter, CounterReadings, Invoice, PaymentHistory, TokenSet};

use crate::error::ApiError;

/// Result alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Client of the TNS-Energo billing API.
///
/// The client owns authentication: it holds the credentials it was built
/// with, attaches tokens to requests, refreshes them when needed and
/// reports every new token set to its [`TokenObserver`].
///
/// # Errors
///
/// Implementations classify failures as [`ApiError::Auth`] (credentials
/// rejected), [`ApiError::Api`] (error answer), [`ApiError::Transport`]
/// (network) or [`ApiError::Decode`] (unexpected payload). Timeouts are
/// applied by the caller.
#[async_trait]
pub trait TnseApi: Send + Sync {
    /// Returns the current access token, if the client has one.
    fn access_token(&self) -> Option<String>;

    /// Logs in with the stored credentials.
    async fn login(&self) -> ApiResult<()>;

    /// Fetches the accounts of the logged-in user.
    async fn get_accounts(&self) -> ApiResult<Vec<AccountSummary>>;

    /// Fetches account metadata by numeric account id.
    async fn get_account_info(&self, account_id: i64) -> ApiResult<Map<String, Value>>;

    /// Fetches the balance of an account.
    async fn get_balance(&self, account: &str) -> ApiResult<Map<String, Value>>;

    /// Fetches the counters of an account.
    async fn get_counters(&self, account: &str) -> ApiResult<Vec<Counter>>;

    /// Fetches the readings (with consumption) of one counter.
    async fn get_counter_readings(
        &self,
        counter_id: &str,
        account: &str,
    ) -> ApiResult<Vec<CounterReadings>>;

    /// Fetches the payment history for one calendar month.
    async fn get_history(&self, account: &str, year: i32, month: u32) -> ApiResult<PaymentHistory>;

    /// Submits meter readings for a counter row. Values are integer strings.
    async fn send_readings(&self, account: &str, row_id: &str, readings: &[String])
    -> ApiResult<Value>;

    /// Fetches the invoice for the month of `date` (`dd.mm.YYYY`).
    async fn get_invoice_file(&self, account: &str, date: &str) -> ApiResult<Invoice>;
}

/// Receives token sets whenever the API client logs in or refreshes tokens.
pub trait TokenObserver: Send + Sync {
    /// Called with the complete new token set.
    fn on_tokens_refreshed(&self, tokens: &TokenSet);
}
