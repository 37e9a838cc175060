//! Error types for callboard-ps
//!
//! Maps the shared error taxonomy onto HTTP responses: Validation → 400,
//! Unauthorized → 401, NotFound → 404, Conflict → 409, everything else 500.
//! Validation responses carry the offending field name so the admin UI and
//! profile editor can highlight it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request shape (400), no specific field
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// callboard-common error, carrying the taxonomy
    #[error(transparent)]
    Common(#[from] callboard_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use callboard_common::Error as CommonError;

        let (status, error_code, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                json!({ "message": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                json!({ "message": msg }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                json!({ "message": msg }),
            ),
            ApiError::Common(err) => match err {
                CommonError::Validation { field, message } => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION",
                    json!({ "message": message, "field": field }),
                ),
                CommonError::Conflict(msg) => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    json!({ "message": msg }),
                ),
                CommonError::NotFound(msg) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    json!({ "message": msg }),
                ),
                CommonError::Unauthorized(msg) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    json!({ "message": msg }),
                ),
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    json!({ "message": other.to_string() }),
                ),
            },
        };

        let mut payload = body;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("error".to_string(), json!(error_code));
        }

        (status, Json(payload)).into_response()
    }
}

/// Result alias for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
