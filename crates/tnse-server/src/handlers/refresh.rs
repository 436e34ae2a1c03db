//! Refresh endpoint.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Response for POST /entries/{entry_id}/refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub entry_id: String,
    pub accounts: usize,
    pub completed_at: DateTime<Utc>,
}

/// POST /entries/{entry_id}/refresh
///
/// Runs a cycle right away and answers once it is published.
#[instrument(skip_all, fields(entry_id = %entry_id))]
pub async fn refresh_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<RefreshResponse>, AppError> {
    let snapshot = state.services().refresh(&entry_id).await?;

    Ok(Json(RefreshResponse {
        entry_id,
        accounts: snapshot.len(),
        completed_at: snapshot.completed_at,
    }))
}
