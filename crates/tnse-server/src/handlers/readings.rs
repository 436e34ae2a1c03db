//! Meter readings submission.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::Value;
use tnse_sync::{SendReadingsRequest, SendReadingsResponse};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Request body for POST /accounts/{account}/readings.
#[derive(Debug, Deserialize)]
pub struct ReadingsBody {
    /// Counter id; the first counter when omitted.
    #[serde(default)]
    pub counter: Option<String>,
    /// One value per tariff.
    #[serde(default)]
    pub values: Vec<Value>,
}

/// POST /accounts/{account}/readings
#[instrument(skip_all, fields(account = %account))]
pub async fn send_readings(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(body): Json<ReadingsBody>,
) -> Result<Json<SendReadingsResponse>, AppError> {
    let request = SendReadingsRequest {
        account,
        counter: body.counter,
        values: body.values,
    };
    let response = state.services().send_readings(&request).await?;

    tracing::info!("Submitted {} reading(s)", response.readings.len());
    Ok(Json(response))
}
