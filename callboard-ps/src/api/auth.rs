//! Authentication middleware for admin routes
//!
//! Admin requests carry a timestamp and a SHA-256 hash over their canonical
//! JSON body plus the shared secret (see callboard_common::api::auth). A
//! failed check is the Authorization error class: 401, terminal for the
//! request. Secret 0 disables checking entirely.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use callboard_common::api::auth::{validate_hash, validate_timestamp, ApiAuthError};
use callboard_common::Error;

use crate::error::ApiError;
use crate::AppState;

/// Body size cap for admin requests; field definitions are small
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct AuthFields {
    timestamp: i64,
    hash: String,
}

/// Validate timestamp and hash on a protected request
///
/// The body is consumed for hash validation and restored for the handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Secret 0 disables all auth checking
    if state.shared_secret == 0 {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read body: {}", e)))?;

    let json_value: Value = serde_json::from_slice(&body_bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;

    let auth_fields: AuthFields = serde_json::from_value(json_value.clone())
        .map_err(|_| unauthorized("Missing timestamp/hash fields"))?;

    validate_timestamp(auth_fields.timestamp).map_err(|e| match e {
        ApiAuthError::InvalidTimestamp { reason, .. } => unauthorized(&reason),
        other => unauthorized(&other.to_string()),
    })?;

    validate_hash(&auth_fields.hash, &json_value, state.shared_secret).map_err(|e| {
        if let ApiAuthError::InvalidHash { provided, calculated } = &e {
            warn!(
                "Hash validation failed: provided={}, calculated={}",
                provided, calculated
            );
        }
        unauthorized("Invalid request hash")
    })?;

    // Restore the body for the downstream handler
    let request = Request::from_parts(parts, Body::from(body_bytes));
    Ok(next.run(request).await)
}

fn unauthorized(message: &str) -> ApiError {
    ApiError::Common(Error::Unauthorized(message.to_string()))
}
