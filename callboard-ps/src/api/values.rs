//! Value read/submit API

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use callboard_common::db::models::EntityKind;
use callboard_common::FieldValue;

use crate::error::{ApiError, ApiResult};
use crate::values;
use crate::AppState;

/// Response for a value read: field name → decoded value
#[derive(Debug, Serialize)]
pub struct ValuesResponse {
    pub entity_kind: EntityKind,
    pub guid: String,
    pub values: BTreeMap<String, FieldValue>,
}

/// Request body for a value submission
#[derive(Debug, Deserialize)]
pub struct SubmitValuesRequest {
    /// Field name → submitted value; null clears a non-required field
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// GET /api/values/:entity_kind/:guid
pub async fn get_values(
    State(state): State<AppState>,
    Path((entity_kind, guid)): Path<(String, String)>,
) -> ApiResult<Json<ValuesResponse>> {
    let kind = parse_kind(&entity_kind)?;
    let values = values::get_values(&state.db, kind, &guid).await?;

    Ok(Json(ValuesResponse {
        entity_kind: kind,
        guid,
        values,
    }))
}

/// POST /api/values/:entity_kind/:guid
///
/// Validates the whole submission, then writes it in one transaction. A
/// validation failure response names the offending field.
pub async fn set_values(
    State(state): State<AppState>,
    Path((entity_kind, guid)): Path<(String, String)>,
    Json(request): Json<SubmitValuesRequest>,
) -> ApiResult<Json<ValuesResponse>> {
    let kind = parse_kind(&entity_kind)?;
    values::set_values(&state.db, kind, &guid, &request.values).await?;

    let values = values::get_values(&state.db, kind, &guid).await?;
    Ok(Json(ValuesResponse {
        entity_kind: kind,
        guid,
        values,
    }))
}

fn parse_kind(raw: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_str(raw).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown entity kind '{}' (expected profile or studio)",
            raw
        ))
    })
}
