//! Error types for the TNS-Energo core crate.
//!
//! Errors raised here concern the persisted config entry and the
//! credential record built from it. Network and refresh failures live
//! in `tnse-sync`.

use thiserror::Error;

/// Convenience alias for results carrying a [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while reading or migrating a persisted config entry.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing from the stored record.
    #[error("missing field '{field}' in config entry")]
    MissingField {
        /// Name of the missing key
        field: String,
    },

    /// A stored field has the wrong shape.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Name of the offending key
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The entry was written by a newer schema than this build understands.
    #[error("unsupported config entry version {version}.{minor_version}")]
    UnsupportedVersion {
        /// Major schema version found in the record
        version: u32,
        /// Minor schema version found in the record
        minor_version: u32,
    },

    /// An option is outside its accepted range.
    #[error("option '{option}' out of range: {reason}")]
    OptionOutOfRange {
        /// Option key
        option: String,
        /// Description of the accepted range
        reason: String,
    },
}

impl CoreError {
    /// Creates a MissingField error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an InvalidField error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error is about the shape of a single field.
    pub fn is_field_error(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::InvalidField { .. })
    }
}
