//! callboard-ps library - Profile Schema service
//!
//! Field/option registries, schema resolution with a read-through cache,
//! and the value store for talent profiles and studios.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod values;

pub use resolver::SchemaCache;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Shared secret for admin API authentication (0 disables)
    pub shared_secret: i64,
    /// Resolved-schema cache, invalidated on registry mutations
    pub schema_cache: Arc<SchemaCache>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, shared_secret: i64, cache_enabled: bool) -> Self {
        Self {
            db,
            shared_secret,
            schema_cache: Arc::new(SchemaCache::new(cache_enabled)),
        }
    }
}

/// Build application router
///
/// Registry and owner-registration mutations require request
/// authentication; schema and value endpoints are fronted by the platform
/// gateway and served without it, as is /health.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, patch, post};

    // Admin routes (require authentication)
    let admin = Router::new()
        .route("/api/fields", get(api::fields::list_fields).post(api::fields::create_field))
        .route(
            "/api/fields/:guid",
            get(api::fields::get_field)
                .patch(api::fields::update_field)
                .delete(api::fields::delete_field),
        )
        .route(
            "/api/fields/:guid/options",
            get(api::options::list_options).post(api::options::create_option),
        )
        .route("/api/fields/:guid/options/reorder", post(api::options::reorder_options))
        .route(
            "/api/options/:guid",
            patch(api::options::update_option).delete(api::options::delete_option),
        )
        .route("/api/entities/:entity_kind", post(api::entities::register_entity))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no request authentication)
    let public = Router::new()
        .route("/api/build_info", get(api::get_build_info))
        .route("/api/schema/:tenant_type", get(api::schema::get_schema))
        .route(
            "/api/values/:entity_kind/:guid",
            get(api::values::get_values).post(api::values::set_values),
        )
        .merge(api::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
