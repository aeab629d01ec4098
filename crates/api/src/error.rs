//! Error types for the HTTP API.
//!
//! Every failure becomes the uniform JSON envelope
//! `{"success": false, "error": "..."}` with a status code matching the
//! error category. Missing and not-owned entities are reported identically
//! (404) so callers cannot probe other tenants' data.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use dispatch::DispatchError;
use flows::FlowError;
use thiserror::Error;

/// Errors that can occur while handling an API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Store error reaching the handler directly.
    #[error("{0}")]
    Database(#[from] DatabaseError),

    /// Distribution/queue/action error.
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    /// Flow editor/publisher error.
    #[error("{0}")]
    Flow(#[from] FlowError),

    /// Malformed request body or parameters.
    #[error("{0}")]
    BadRequest(String),

    /// No usable principal on the request.
    #[error("authentication required")]
    Unauthorized,

    /// The principal's role does not cover this operation.
    #[error("not allowed")]
    Forbidden,
}

fn database_status(err: &DatabaseError) -> StatusCode {
    match err {
        DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
        DatabaseError::AlreadyExists { .. } | DatabaseError::Conflict { .. } => {
            StatusCode::CONFLICT
        }
        DatabaseError::Sqlx(_) | DatabaseError::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Database(err) => database_status(err),
            ApiError::Dispatch(err) => match err {
                DispatchError::Database(inner) => database_status(inner),
                DispatchError::AlreadyAssigned(_) | DispatchError::NotDistributable(_) => {
                    StatusCode::CONFLICT
                }
                DispatchError::AttendantNotEligible(_) | DispatchError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            ApiError::Flow(err) => match err {
                FlowError::Database(inner) => database_status(inner),
                FlowError::InvalidConfig { .. } | FlowError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store faults get logged with context and reported generically;
        // business errors travel to the caller as-is.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "success": false,
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
