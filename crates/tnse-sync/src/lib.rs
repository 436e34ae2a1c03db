//! # TNS-Energo Sync
//!
//! Refresh coordination for TNS-Energo accounts.
//!
//! This crate drives an upstream [`TnseApi`] implementation through
//! periodic refresh cycles and publishes consistent snapshots.
//!
//! ## Features
//!
//! - Bounded retry with per-attempt timeouts and jittered backoff
//! - All-or-nothing snapshot publication per cycle
//! - Token persistence through a [`ConfigStore`]
//! - Interval scheduling with debounced explicit requests
//! - Service actions: refresh, readings submission, bill download
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tnse_sync::{JsonFileStore, RefreshCoordinator, RefreshScheduler, RetryPolicy};
//!
//! let store = Arc::new(JsonFileStore::open("entry.json")?);
//! let coordinator = Arc::new(RefreshCoordinator::new(
//!     "entry-1",
//!     store,
//!     RetryPolicy::default(),
//!     |credentials, observer| Arc::new(MyClient::new(credentials, observer)),
//! )?);
//!
//! coordinator.first_refresh().await?;
//! let handle = RefreshScheduler::for_coordinator(coordinator.clone()).start();
//! ```

pub mod api;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod services;
pub mod store;

// Re-exports
pub use api::{ApiResult, TnseApi, TokenObserver};
pub use coordinator::{CoordinatorState, CredentialSink, RefreshCoordinator, SyncState};
pub use error::{ApiError, RefreshError, ServiceError, StoreError};
pub use registry::CoordinatorRegistry;
pub use retry::RetryPolicy;
pub use scheduler::{RefreshConfig, RefreshHandle, RefreshScheduler};
pub use services::{
    BillResponse, GetBillRequest, SendReadingsRequest, SendReadingsResponse, ServiceEvent,
    ServiceHandler, ServiceKind,
};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};

// Re-export tnse_core for consumers
pub use tnse_core;
