//! Refresh coordination.
//!
//! A [`RefreshCoordinator`] turns a sequence of upstream calls into one
//! consistent multi-account [`Snapshot`](tnse_core::Snapshot) per cycle.
//!
//! # Cycle
//!
//! ```text
//! accounts ──► per account: info, balance, counters      (critical)
//!          └─► per counter: readings with consumption    (non-critical)
//!          └─► history: current month, then previous     (non-critical)
//! ```
//!
//! A critical failure aborts the cycle with `UpdateFailed`; an auth error
//! from any step aborts it with `ReauthRequired`.

mod credentials;
mod refresh;
mod state;

pub use credentials::CredentialSink;
pub use refresh::RefreshCoordinator;
pub use state::{CoordinatorState, SyncState};
