use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;

use crate::handlers::{
    bill::get_bill,
    entries::{get_accounts, get_diagnostics, get_sensors},
    health::health_check,
    metrics::metrics_handler,
    readings::send_readings,
    refresh::refresh_entry,
};
use crate::metrics::init_metrics;
use crate::middleware::{LoggingLayer, RequestIdLayer};
use crate::settings::Settings;
use crate::state::AppState;

/// Creates a router with the given application state and metrics handle.
pub fn create_router_with_state(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    // Metrics endpoint has its own state
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    let app_router = Router::new()
        .route("/health", get(health_check))
        // Entry routes
        .route("/entries/{entry_id}/accounts", get(get_accounts))
        .route("/entries/{entry_id}/sensors", get(get_sensors))
        .route("/entries/{entry_id}/diagnostics", get(get_diagnostics))
        .route("/entries/{entry_id}/refresh", post(refresh_entry))
        // Account actions
        .route("/accounts/{account}/readings", post(send_readings))
        .route("/accounts/{account}/bill", post(get_bill))
        .with_state(state);

    Router::new()
        .merge(app_router)
        .merge(metrics_router)
        .layer(middleware::from_fn(
            crate::metrics::http::http_metrics_middleware,
        ))
        .layer(middleware_stack)
}

/// Creates a router serving only the health endpoint.
pub fn create_router() -> Router {
    let middleware = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    Router::new()
        .route("/health", get(health_check))
        .layer(middleware)
}

/// Runs the server with the given state and metrics handle.
pub async fn run_server_with_state(
    addr: SocketAddr,
    state: AppState,
    prometheus_handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = create_router_with_state(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Installs metrics and serves `state` on the configured address.
pub async fn serve(settings: &Settings, state: AppState) -> anyhow::Result<()> {
    let addr = settings
        .socket_addr()
        .with_context(|| format!("invalid bind address {}:{}", settings.host, settings.port))?;
    let prometheus_handle = init_metrics().context("failed to install metrics recorder")?;

    tracing::info!(
        "Starting TNS-Energo server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Bills directory: {}", settings.bill_dir.display());

    run_server_with_state(addr, state, prometheus_handle)
        .await
        .context("server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
