//! Coordinator lifecycle and refresh bookkeeping.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Lifecycle state of a refresh coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Not set up yet.
    Uninitialized,
    /// Authenticated and idle.
    Ready,
    /// A cycle is in flight.
    Refreshing,
    /// Credentials were rejected; nothing runs until re-authentication.
    AuthFailed,
    /// Initial login failed with a non-auth error.
    SetupRetry,
}

impl CoordinatorState {
    /// Returns the state name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Refreshing => "refreshing",
            Self::AuthFailed => "auth_failed",
            Self::SetupRetry => "setup_retry",
        }
    }
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the outcome of refresh cycles.
#[derive(Debug)]
pub struct SyncState {
    /// Completion time of the last successful cycle.
    last_refresh: RwLock<Option<DateTime<Utc>>>,
    /// The last error message, if any.
    last_error: RwLock<Option<String>>,
    /// Number of consecutive failures.
    failure_count: RwLock<u32>,
    /// Whether the most recent cycle succeeded.
    last_update_success: RwLock<bool>,
}

impl SyncState {
    /// Creates an empty SyncState.
    pub fn new() -> Self {
        Self {
            last_refresh: RwLock::new(None),
            last_error: RwLock::new(None),
            failure_count: RwLock::new(0),
            last_update_success: RwLock::new(false),
        }
    }

    /// Records a successful cycle.
    pub fn record_success(&self, completed_at: DateTime<Utc>) {
        let mut last_refresh = self.last_refresh.write();
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();
        let mut success = self.last_update_success.write();

        *last_refresh = Some(completed_at);
        *last_error = None;
        *failure_count = 0;
        *success = true;
    }

    /// Records a failed cycle.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut last_error = self.last_error.write();
        let mut failure_count = self.failure_count.write();
        let mut success = self.last_update_success.write();

        *last_error = Some(error.into());
        *failure_count += 1;
        *success = false;
    }

    /// Returns the completion time of the last successful cycle.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.read()
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Returns the number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        *self.failure_count.read()
    }

    /// Returns true if the most recent cycle succeeded.
    pub fn last_update_success(&self) -> bool {
        *self.last_update_success.read()
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}
