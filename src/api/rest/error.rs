//! Error handling for REST endpoints.
//!
//! Provides the `AppError` type used across all handlers. Upstream failures
//! map onto the four request outcomes: bad request, not found, and internal
//! (auth, path-resolution, and transfer failures all surface as 500s).

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::drive::DriveError;
use crate::gcs::GcsError;
use crate::resolver::ResolveError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                // Log full details server-side, return a generic message
                tracing::error!(details = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<DriveError> for AppError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::NotFound(id) => AppError::NotFound(format!("file not found: {}", id)),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<GcsError> for AppError {
    fn from(err: GcsError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Drive(e) => e.into(),
            cycle @ ResolveError::Cycle(_) => AppError::Internal(cycle.to_string()),
        }
    }
}
