use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tnse_sync::{RefreshError, ServiceError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No coordinator is registered for the entry.
    #[error("config entry not found: {0}")]
    EntryNotFound(String),

    /// Invalid parameters.
    #[error("{0}")]
    BadRequest(String),

    /// A service action failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Reading the stored entry failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    message: String,
}

impl AppError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EntryNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Service(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            AppError::Service(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Service(e) => match e {
                ServiceError::Refresh(RefreshError::ReauthRequired(_)) => StatusCode::UNAUTHORIZED,
                ServiceError::Refresh(RefreshError::SetupRetry(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                },
                ServiceError::Refresh(RefreshError::UpdateFailed(_))
                | ServiceError::NoFileInResponse { .. }
                | ServiceError::InvalidFile(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::EntryNotFound(_) => "entry_not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Service(e) => e.code(),
            AppError::Store(_) => "store_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            code: self.code(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
