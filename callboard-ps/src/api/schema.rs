//! Schema resolution API

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use callboard_common::db::models::TenantType;

use crate::error::{ApiError, ApiResult};
use crate::resolver::ResolvedField;
use crate::AppState;

/// Resolved schema response
#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub tenant_type: TenantType,
    pub fields: Vec<ResolvedField>,
}

/// GET /api/schema/:tenant_type
///
/// Returns the ordered field list (with options) a tenant of the given type
/// renders as its profile form. Served from the schema cache.
pub async fn get_schema(
    State(state): State<AppState>,
    Path(tenant_type): Path<String>,
) -> ApiResult<Json<SchemaResponse>> {
    let tenant = TenantType::from_str(&tenant_type).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown tenant type '{}' (expected talent or studio)",
            tenant_type
        ))
    })?;

    let fields = state.schema_cache.resolve(&state.db, tenant).await?;

    Ok(Json(SchemaResponse {
        tenant_type: tenant,
        fields: fields.as_ref().clone(),
    }))
}
