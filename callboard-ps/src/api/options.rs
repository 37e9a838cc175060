//! Option administration API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use callboard_common::db::models::FieldOption;

use crate::api::fields::DeleteQuery;
use crate::error::ApiResult;
use crate::registry::{self, OptionPatch, OptionSpec};
use crate::AppState;

/// Request body for option reordering
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Every option guid of the field, in the desired display order
    pub order: Vec<String>,
}

/// GET /api/fields/:guid/options
pub async fn list_options(
    State(state): State<AppState>,
    Path(field_guid): Path<String>,
) -> ApiResult<Json<Vec<FieldOption>>> {
    // Existence check so an unknown field is 404, not an empty list
    registry::get_field(&state.db, &field_guid).await?;
    let options = registry::list_options(&state.db, &field_guid).await?;
    Ok(Json(options))
}

/// POST /api/fields/:guid/options
pub async fn create_option(
    State(state): State<AppState>,
    Path(field_guid): Path<String>,
    Json(spec): Json<OptionSpec>,
) -> ApiResult<(StatusCode, Json<FieldOption>)> {
    let option = registry::create_option(&state.db, &field_guid, &spec).await?;
    state.schema_cache.invalidate().await;
    Ok((StatusCode::CREATED, Json(option)))
}

/// PATCH /api/options/:guid
pub async fn update_option(
    State(state): State<AppState>,
    Path(guid): Path<String>,
    Json(patch): Json<OptionPatch>,
) -> ApiResult<Json<FieldOption>> {
    let option = registry::update_option(&state.db, &guid, &patch).await?;
    state.schema_cache.invalidate().await;
    Ok(Json(option))
}

/// DELETE /api/options/:guid?cascade=true|false
pub async fn delete_option(
    State(state): State<AppState>,
    Path(guid): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    registry::delete_option(&state.db, &guid, query.cascade).await?;
    state.schema_cache.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/fields/:guid/options/reorder
pub async fn reorder_options(
    State(state): State<AppState>,
    Path(field_guid): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<FieldOption>>> {
    let options = registry::reorder_options(&state.db, &field_guid, &request.order).await?;
    state.schema_cache.invalidate().await;
    Ok(Json(options))
}
