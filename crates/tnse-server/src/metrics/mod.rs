//! Metrics for the TNS-Energo server.

pub mod http;
pub mod setup;
pub mod sync;

pub use setup::{detached_handle, init_metrics};
