//! Bill download.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tnse_sync::{BillResponse, GetBillRequest};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Request body for POST /accounts/{account}/bill.
#[derive(Debug, Default, Deserialize)]
pub struct BillBody {
    /// Any day of the billing month (`YYYY-MM-DD`); previous month when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// POST /accounts/{account}/bill
#[instrument(skip_all, fields(account = %account))]
pub async fn get_bill(
    State(state): State<AppState>,
    Path(account): Path<String>,
    Json(body): Json<BillBody>,
) -> Result<Json<BillResponse>, AppError> {
    let request = GetBillRequest {
        account,
        date: body.date,
    };
    let response = state.services().get_bill(&request).await?;

    tracing::info!("Saved bill to {}", response.file_path.display());
    Ok(Json(response))
}
