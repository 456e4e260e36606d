//! HTTP error mapping.
//!
//! The boundary maps pipeline errors to status codes; it performs no
//! interpretation of pipeline semantics beyond the validation split.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use depositflow::errors::ExecuteError;

/// Error returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or semantically invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No record under the given identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The pipeline run failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ExecuteError> for ApiError {
    fn from(err: ExecuteError) -> Self {
        if err.is_validation() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = ErrorResponse {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
