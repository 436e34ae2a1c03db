//! Upstream API abstraction.
//!
//! No concrete HTTP client lives here; the host provides one implementing
//! [`TnseApi`] and reports token changes through a [`TokenObserver`].

mod traits;

pub use traits::{ApiResult, TnseApi, TokenObserver};
