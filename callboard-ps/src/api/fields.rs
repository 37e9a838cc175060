//! Field administration API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use callboard_common::db::models::Field;

use crate::error::ApiResult;
use crate::registry::{self, FieldPatch, FieldSpec};
use crate::AppState;

/// Query parameters for field deletion
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Also delete stored values referencing the field
    #[serde(default)]
    pub cascade: bool,
}

/// GET /api/fields
///
/// Admin listing: every field, including invisible ones.
pub async fn list_fields(State(state): State<AppState>) -> ApiResult<Json<Vec<Field>>> {
    let fields = registry::list_fields(&state.db).await?;
    Ok(Json(fields))
}

/// POST /api/fields
pub async fn create_field(
    State(state): State<AppState>,
    Json(spec): Json<FieldSpec>,
) -> ApiResult<(StatusCode, Json<Field>)> {
    let field = registry::create_field(&state.db, &spec).await?;
    state.schema_cache.invalidate().await;
    Ok((StatusCode::CREATED, Json(field)))
}

/// GET /api/fields/:guid
pub async fn get_field(
    State(state): State<AppState>,
    Path(guid): Path<String>,
) -> ApiResult<Json<Field>> {
    let field = registry::get_field(&state.db, &guid).await?;
    Ok(Json(field))
}

/// PATCH /api/fields/:guid
pub async fn update_field(
    State(state): State<AppState>,
    Path(guid): Path<String>,
    Json(patch): Json<FieldPatch>,
) -> ApiResult<Json<Field>> {
    let field = registry::update_field(&state.db, &guid, &patch).await?;
    state.schema_cache.invalidate().await;
    Ok(Json(field))
}

/// DELETE /api/fields/:guid?cascade=true|false
pub async fn delete_field(
    State(state): State<AppState>,
    Path(guid): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    registry::delete_field(&state.db, &guid, query.cascade).await?;
    state.schema_cache.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}
