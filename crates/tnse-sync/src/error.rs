//! Error types for API calls, refresh cycles and service actions.

use tnse_core::CoreError;

/// Errors reported by the upstream API client or produced by the retry policy.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Credentials were rejected. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API answered with an error.
    #[error("API error: {0}")]
    Api(String),

    /// The request did not reach the API.
    #[error("transport error: {0}")]
    Transport(String),

    /// A single attempt exceeded its timeout.
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Every attempt failed.
    #[error("failed after {attempts} attempts: {operation}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ApiError>,
    },

    /// The response could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Creates a new authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a new API error.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Creates a new transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Returns true if this is an authentication error.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api(_) | Self::Transport(_) | Self::Timeout { .. }
        )
    }
}

/// Outcome of a failed refresh cycle or coordinator call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// Credentials must be re-entered; the entry stays unusable until then.
    #[error("re-authentication required: {0}")]
    ReauthRequired(String),

    /// The cycle failed; the previous snapshot is retained.
    #[error("update failed: {0}")]
    UpdateFailed(String),

    /// Initial login failed with a non-auth error; setup should be retried.
    #[error("setup failed, will retry: {0}")]
    SetupRetry(String),
}

impl RefreshError {
    /// Returns true if re-authentication is required.
    pub fn is_reauth(&self) -> bool {
        matches!(self, Self::ReauthRequired(_))
    }
}

impl From<ApiError> for RefreshError {
    fn from(err: ApiError) -> Self {
        if err.is_auth() {
            Self::ReauthRequired(format!("TNS-Energo auth error: {}", err))
        } else {
            Self::UpdateFailed(format!("TNS-Energo API error: {}", err))
        }
    }
}

/// Errors raised by a config store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored record is invalid.
    #[error(transparent)]
    Entry(#[from] CoreError),
}

/// Errors raised by service actions.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A reading required by the counter's tariff count is missing or not numeric.
    #[error("account {account}: reading for {tariff} is missing (counter needs {need})")]
    TariffMissing {
        account: String,
        tariff: String,
        need: usize,
    },

    /// More readings than the counter's tariff count were supplied.
    #[error("account {account}: unexpected reading for {tariff} (counter needs {need})")]
    TariffExtra {
        account: String,
        tariff: String,
        need: usize,
    },

    /// No coordinator is registered for the entry.
    #[error("config entry not found: {0}")]
    EntryNotFound(String),

    /// No coordinator knows the account.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// The account has no such counter.
    #[error("account {account}: counter not found: {counter}")]
    CounterNotFound { account: String, counter: String },

    /// The invoice response carried no file.
    #[error("account {account}: no file in response")]
    NoFileInResponse { account: String },

    /// The invoice file could not be decoded.
    #[error("invalid invoice file: {0}")]
    InvalidFile(String),

    /// The coordinator call failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Writing the invoice failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TariffMissing { .. } => "tariff_missing",
            Self::TariffExtra { .. } => "tariff_extra",
            Self::EntryNotFound(_) => "entry_not_found",
            Self::AccountNotFound(_) => "account_not_found",
            Self::CounterNotFound { .. } => "counter_not_found",
            Self::NoFileInResponse { .. } => "no_file_in_response",
            Self::InvalidFile(_) => "invalid_file",
            Self::Refresh(RefreshError::ReauthRequired(_)) => "reauth_required",
            Self::Refresh(RefreshError::UpdateFailed(_)) => "update_failed",
            Self::Refresh(RefreshError::SetupRetry(_)) => "setup_retry",
            Self::Io(_) => "io_error",
        }
    }

    /// Returns true for input validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::TariffMissing { .. } | Self::TariffExtra { .. })
    }

    /// Returns true if the referenced entry, account or counter does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound(_) | Self::AccountNotFound(_) | Self::CounterNotFound { .. }
        )
    }
}
