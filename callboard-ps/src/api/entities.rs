//! Owner registration API
//!
//! Called by the account service when a talent or studio account is
//! created, so value submissions have a referential target.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use callboard_common::db::models::EntityKind;

use crate::db::entities::create_entity;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Request body for owner registration
#[derive(Debug, Deserialize)]
pub struct RegisterEntityRequest {
    /// Account guid; generated when absent
    #[serde(default)]
    pub guid: Option<String>,
    pub display_name: String,
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterEntityResponse {
    pub entity_kind: EntityKind,
    pub guid: String,
}

/// POST /api/entities/:entity_kind
pub async fn register_entity(
    State(state): State<AppState>,
    Path(entity_kind): Path<String>,
    Json(request): Json<RegisterEntityRequest>,
) -> ApiResult<(StatusCode, Json<RegisterEntityResponse>)> {
    let kind = EntityKind::from_str(&entity_kind).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown entity kind '{}' (expected profile or studio)",
            entity_kind
        ))
    })?;

    let guid = create_entity(&state.db, kind, request.guid, &request.display_name).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterEntityResponse {
            entity_kind: kind,
            guid,
        }),
    ))
}
