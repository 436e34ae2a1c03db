//! Persisted config entry and its schema migrations.
//!
//! The host stores one entry per configured integration. The entry is an
//! opaque key-value record plus a schema version; this module knows which
//! keys matter and how to bring older records up to date.
//!
//! # Versions
//!
//! ```text
//! 1.x  → no email (account-number based login)
//! 2.0  → email + password + region
//! 2.1  → tokens and their expiries may be persisted
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Key of the region selector.
pub const CONF_REGION: &str = "region";
/// Key of the login email.
pub const CONF_EMAIL: &str = "email";
/// Key of the login password.
pub const CONF_PASSWORD: &str = "password";
/// Key of the access token.
pub const CONF_ACCESS_TOKEN: &str = "access_token";
/// Key of the refresh token.
pub const CONF_REFRESH_TOKEN: &str = "refresh_token";
/// Key of the access token expiry.
pub const CONF_ACCESS_TOKEN_EXPIRES: &str = "access_token_expires";
/// Key of the refresh token expiry.
pub const CONF_REFRESH_TOKEN_EXPIRES: &str = "refresh_token_expires";
/// Option key of the refresh interval in hours.
pub const CONF_SCAN_INTERVAL: &str = "scan_interval";

/// Current major schema version.
pub const CURRENT_VERSION: u32 = 2;
/// Current minor schema version.
pub const CURRENT_MINOR_VERSION: u32 = 1;

/// Default refresh interval in hours.
pub const DEFAULT_SCAN_INTERVAL_HOURS: u64 = 24;
/// Smallest accepted refresh interval in hours.
pub const MIN_SCAN_INTERVAL_HOURS: u64 = 1;
/// Largest accepted refresh interval in hours (one week).
pub const MAX_SCAN_INTERVAL_HOURS: u64 = 168;

/// A persisted config entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Major schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Minor schema version.
    #[serde(default)]
    pub minor_version: u32,
    /// Credential and token data.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// User options.
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Set when the stored credentials must be re-entered before use.
    #[serde(default)]
    pub reauth_required: bool,
}

fn default_version() -> u32 {
    1
}

/// Result of migrating an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationOutcome {
    /// True if the entry was modified and should be persisted.
    pub changed: bool,
    /// True if the user must re-authenticate.
    pub reauth_required: bool,
}

impl ConfigEntry {
    /// Creates an entry at the current schema version.
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            version: CURRENT_VERSION,
            minor_version: CURRENT_MINOR_VERSION,
            data,
            options: Map::new(),
            reauth_required: false,
        }
    }

    /// Builder-style method to set an option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Migrates the entry in place to the current schema version.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedVersion`] for entries written by a newer schema.
    pub fn migrate(&mut self) -> Result<MigrationOutcome> {
        let mut outcome = MigrationOutcome::default();

        if self.version > CURRENT_VERSION
            || (self.version == CURRENT_VERSION && self.minor_version > CURRENT_MINOR_VERSION)
        {
            return Err(CoreError::UnsupportedVersion {
                version: self.version,
                minor_version: self.minor_version,
            });
        }

        if self.version < 2 {
            self.data
                .entry(CONF_EMAIL)
                .or_insert_with(|| Value::String(String::new()));
            self.version = 2;
            self.minor_version = 0;
            self.reauth_required = true;
            outcome.changed = true;
        }

        if self.minor_version < CURRENT_MINOR_VERSION {
            self.minor_version = CURRENT_MINOR_VERSION;
            outcome.changed = true;
        }

        outcome.reauth_required = self.reauth_required;
        Ok(outcome)
    }

    /// Merges a patch into the data map: new keys overwrite, others are preserved.
    pub fn merge_data(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.data.insert(key, value);
        }
    }

    /// Replaces the data map after a successful re-authentication.
    pub fn replace_data(&mut self, data: Map<String, Value>) {
        self.data = data;
        self.reauth_required = false;
    }

    /// Returns the configured refresh interval in hours.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OptionOutOfRange`] when the option is outside 1..=168
    /// or not an integer.
    pub fn scan_interval_hours(&self) -> Result<u64> {
        let Some(raw) = self.options.get(CONF_SCAN_INTERVAL) else {
            return Ok(DEFAULT_SCAN_INTERVAL_HOURS);
        };

        raw.as_u64()
            .filter(|h| (MIN_SCAN_INTERVAL_HOURS..=MAX_SCAN_INTERVAL_HOURS).contains(h))
            .ok_or_else(|| CoreError::OptionOutOfRange {
                option: CONF_SCAN_INTERVAL.to_string(),
                reason: format!(
                    "expected {}..={} hours, got {}",
                    MIN_SCAN_INTERVAL_HOURS, MAX_SCAN_INTERVAL_HOURS, raw
                ),
            })
    }
}
