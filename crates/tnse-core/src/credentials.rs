//! Credential state read from the persisted config entry.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

use crate::entry::{
    CONF_ACCESS_TOKEN, CONF_ACCESS_TOKEN_EXPIRES, CONF_EMAIL, CONF_PASSWORD, CONF_REFRESH_TOKEN,
    CONF_REFRESH_TOKEN_EXPIRES, CONF_REGION, ConfigEntry,
};
use crate::error::{CoreError, Result};

/// Format used when persisting token expiry timestamps (UTC, fraction kept when non-zero).
pub const EXPIRES_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Tokens reported by the API client after a login or token refresh.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    /// Bearer access token.
    pub access_token: Option<String>,
    /// Refresh token.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub access_token_expires: Option<NaiveDateTime>,
    /// Refresh token expiry.
    pub refresh_token_expires: Option<NaiveDateTime>,
}

impl TokenSet {
    /// Returns the token set as a patch for the config entry data.
    ///
    /// All four keys are always present; absent values are written as `null`.
    pub fn to_patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        patch.insert(CONF_ACCESS_TOKEN.into(), opt_string(&self.access_token));
        patch.insert(CONF_REFRESH_TOKEN.into(), opt_string(&self.refresh_token));
        patch.insert(
            CONF_ACCESS_TOKEN_EXPIRES.into(),
            opt_timestamp(self.access_token_expires),
        );
        patch.insert(
            CONF_REFRESH_TOKEN_EXPIRES.into(),
            opt_timestamp(self.refresh_token_expires),
        );
        patch
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &self.access_token.as_ref().map(|_| "**REDACTED**"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "**REDACTED**"))
            .field("access_token_expires", &self.access_token_expires)
            .field("refresh_token_expires", &self.refresh_token_expires)
            .finish()
    }
}

/// Credentials and tokens for one integration entry.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialState {
    /// Region selector (API subdomain).
    pub region: String,
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
    /// Saved tokens, if any.
    pub tokens: TokenSet,
}

impl CredentialState {
    /// Creates credentials without saved tokens.
    pub fn new(
        region: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            email: email.into(),
            password: password.into(),
            tokens: TokenSet::default(),
        }
    }

    /// Builds the credential state from a (migrated) config entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `email` is missing or an expiry timestamp is malformed.
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self> {
        let data = &entry.data;
        let email = data
            .get(CONF_EMAIL)
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::missing(CONF_EMAIL))?;

        Ok(Self {
            region: str_field(data, CONF_REGION).unwrap_or_default(),
            email: email.to_string(),
            password: str_field(data, CONF_PASSWORD).unwrap_or_default(),
            tokens: TokenSet {
                access_token: str_field(data, CONF_ACCESS_TOKEN),
                refresh_token: str_field(data, CONF_REFRESH_TOKEN),
                access_token_expires: timestamp_field(data, CONF_ACCESS_TOKEN_EXPIRES)?,
                refresh_token_expires: timestamp_field(data, CONF_REFRESH_TOKEN_EXPIRES)?,
            },
        })
    }
}

impl std::fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialState")
            .field("region", &self.region)
            .field("email", &self.email)
            .field("password", &"**REDACTED**")
            .field("tokens", &self.tokens)
            .finish()
    }
}

/// Parses a stored expiry timestamp. Offset-less values are taken as UTC;
/// values carrying an offset are converted to UTC.
pub fn parse_expires(value: &str) -> Option<NaiveDateTime> {
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

fn str_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn timestamp_field(data: &Map<String, Value>, key: &str) -> Result<Option<NaiveDateTime>> {
    match str_field(data, key) {
        None => Ok(None),
        Some(raw) => parse_expires(&raw)
            .map(Some)
            .ok_or_else(|| CoreError::invalid(key, format!("'{}' is not an ISO timestamp", raw))),
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn opt_timestamp(value: Option<NaiveDateTime>) -> Value {
    value
        .map(|ts| Value::String(ts.format(EXPIRES_FORMAT).to_string()))
        .unwrap_or(Value::Null)
}
