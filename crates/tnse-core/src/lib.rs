//! # TNS-Energo Core
//!
//! Domain types for the TNS-Energo billing integration.
//!
//! This crate has no I/O. It defines what a refresh cycle produces and
//! how the persisted config entry is read:
//!
//! - [`AccountSnapshot`] / [`Snapshot`]: the data published per cycle
//! - upstream response models with lenient decoding
//! - [`CredentialState`] and [`ConfigEntry`] with schema migration
//! - sensor mapping and redacted diagnostics
//!
//! ## Example
//!
//! ```ignore
//! use tnse_core::{ConfigEntry, CredentialState};
//!
//! let mut entry: ConfigEntry = serde_json::from_str(&stored)?;
//! let outcome = entry.migrate()?;
//! let creds = CredentialState::from_entry(&entry)?;
//! ```

pub mod account;
pub mod credentials;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod model;
pub mod sensor;
pub mod value;

// Re-exports
pub use account::{AccountSnapshot, Snapshot};
pub use credentials::{CredentialState, TokenSet};
pub use diagnostics::{CoordinatorStatus, entry_diagnostics};
pub use entry::{ConfigEntry, MigrationOutcome};
pub use error::{CoreError, Result};
pub use model::{AccountSummary, Counter, CounterReadings, HistoryItem, Invoice, PaymentHistory, Reading};
pub use sensor::{AccountSensor, CounterSensor, SensorState, SensorValue, sensors_for, snapshot_sensors};
