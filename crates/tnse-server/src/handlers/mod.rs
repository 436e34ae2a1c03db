//! HTTP handlers.

pub mod bill;
pub mod entries;
pub mod health;
pub mod metrics;
pub mod readings;
pub mod refresh;
