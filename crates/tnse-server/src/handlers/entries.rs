//! Read-only entry endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tnse_core::{AccountSnapshot, SensorState, snapshot_sensors};
use tnse_sync::CoordinatorState;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Response for GET /entries/{entry_id}/accounts.
#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub entry_id: String,
    pub state: CoordinatorState,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_update_success: bool,
    pub accounts: Vec<AccountSnapshot>,
}

/// GET /entries/{entry_id}/accounts
#[instrument(skip_all, fields(entry_id = %entry_id))]
pub async fn get_accounts(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<AccountsResponse>, AppError> {
    let coordinator = state.coordinator(&entry_id)?;
    let accounts = coordinator
        .data()
        .map(|snapshot| snapshot.accounts.clone())
        .unwrap_or_default();

    Ok(Json(AccountsResponse {
        entry_id,
        state: coordinator.state(),
        last_update_time: coordinator.last_update_time(),
        last_update_success: coordinator.last_update_success(),
        accounts,
    }))
}

/// GET /entries/{entry_id}/sensors
#[instrument(skip_all, fields(entry_id = %entry_id))]
pub async fn get_sensors(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<Vec<SensorState>>, AppError> {
    let coordinator = state.coordinator(&entry_id)?;
    let sensors = coordinator
        .data()
        .map(|snapshot| snapshot_sensors(&snapshot))
        .unwrap_or_default();

    tracing::debug!("Rendering {} sensor(s)", sensors.len());
    Ok(Json(sensors))
}

/// GET /entries/{entry_id}/diagnostics
#[instrument(skip_all, fields(entry_id = %entry_id))]
pub async fn get_diagnostics(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let coordinator = state.coordinator(&entry_id)?;
    Ok(Json(coordinator.diagnostics()?))
}
