//! # TNS-Energo Server
//!
//! HTTP action surface over registered refresh coordinators.
//!
//! ## Routes
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/health` | liveness |
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/entries/{entry_id}/accounts` | latest snapshot |
//! | GET | `/entries/{entry_id}/sensors` | sensor states |
//! | GET | `/entries/{entry_id}/diagnostics` | redacted dump |
//! | POST | `/entries/{entry_id}/refresh` | run a cycle now |
//! | POST | `/accounts/{account}/readings` | submit readings |
//! | POST | `/accounts/{account}/bill` | download a bill |
//!
//! ## Example
//!
//! ```ignore
//! let settings = Settings::load(Some(Path::new("tnse.toml")))?;
//! init_tracing(&settings.log_filter)?;
//!
//! let state = AppState::new(&settings.bill_dir);
//! coordinator.first_refresh().await?;
//! state.attach(coordinator, RefreshConfig::default().cooldown(settings.request_cooldown()));
//!
//! serve(&settings, state).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod state;
pub mod telemetry;

pub use error::AppError;
pub use server::{create_router, create_router_with_state, run_server_with_state, serve};
pub use settings::Settings;
pub use state::AppState;
pub use telemetry::init_tracing;
