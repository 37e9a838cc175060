//! Integration tests for the callboard-ps HTTP API
//!
//! Drives the full router through tower::ServiceExt::oneshot: schema
//! resolution, value submission, admin field management and request
//! authentication.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use callboard_common::api::auth::calculate_hash;
use callboard_common::db::init::{
    create_field_options_table, create_fields_table, create_profile_field_values_table,
    create_profiles_table, create_settings_table, create_studio_field_values_table,
    create_studios_table,
};
use callboard_ps::{build_router, AppState};

/// Build a router over a fresh in-memory database
///
/// Single connection: pooled in-memory SQLite gives each connection its
/// own database, so the pool must not grow past one.
async fn setup_test_app(shared_secret: i64) -> (axum::Router, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    create_settings_table(&pool).await.unwrap();
    create_profiles_table(&pool).await.unwrap();
    create_studios_table(&pool).await.unwrap();
    create_fields_table(&pool).await.unwrap();
    create_field_options_table(&pool).await.unwrap();
    create_profile_field_values_table(&pool).await.unwrap();
    create_studio_field_values_table(&pool).await.unwrap();

    let state = AppState::new(pool.clone(), shared_secret, true);
    (build_router(state), pool)
}

/// Make an HTTP request against the router, returning status and JSON body
async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let mut builder = Request::builder().method(method).uri(path);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let request = match body {
        Some(json_body) => builder.body(Body::from(json_body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let parsed = serde_json::from_slice(&bytes).ok();

    (status, parsed)
}

/// Attach a valid timestamp and hash to an admin request body
fn signed(mut body: Value, shared_secret: i64) -> Value {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;

    let obj = body.as_object_mut().expect("admin bodies are objects");
    obj.insert("timestamp".to_string(), json!(now));
    obj.insert("hash".to_string(), json!("pending"));

    let hash = calculate_hash(&body, shared_secret);
    body.as_object_mut()
        .unwrap()
        .insert("hash".to_string(), json!(hash));
    body
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _pool) = setup_test_app(0).await;

    let (status, body) = make_request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "callboard-ps");
}

#[tokio::test]
async fn test_schema_endpoint_rejects_unknown_tenant() {
    let (app, _pool) = setup_test_app(0).await;

    let (status, _) = make_request(&app, Method::GET, "/api/schema/agency", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_field_lifecycle_through_api() {
    let (app, _pool) = setup_test_app(0).await;

    // Create a single-choice talent field
    let (status, body) = make_request(
        &app,
        Method::POST,
        "/api/fields",
        Some(json!({
            "name": "favorite_color",
            "label": "Favorite color",
            "field_type": "single_choice",
            "applicability": "talent",
            "required": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let field_guid = body.unwrap()["guid"].as_str().unwrap().to_string();

    // Add options
    for token in ["red", "blue"] {
        let (status, _) = make_request(
            &app,
            Method::POST,
            &format!("/api/fields/{}/options", field_guid),
            Some(json!({ "value": token, "label": token })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // The talent schema (already cached from any earlier read) now shows
    // the new field: mutations invalidate the cache
    let (status, body) = make_request(&app, Method::GET, "/api/schema/talent", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["name"], "favorite_color");
    assert_eq!(fields[0]["options"].as_array().unwrap().len(), 2);

    // The studio schema does not include it
    let (_, body) = make_request(&app, Method::GET, "/api/schema/studio", None).await;
    assert_eq!(body.unwrap()["fields"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_value_submission_flow() {
    let (app, _pool) = setup_test_app(0).await;

    // Field + options
    let (_, body) = make_request(
        &app,
        Method::POST,
        "/api/fields",
        Some(json!({
            "name": "favorite_color",
            "label": "Favorite color",
            "field_type": "single_choice",
            "applicability": "talent",
            "required": true
        })),
    )
    .await;
    let field_guid = body.unwrap()["guid"].as_str().unwrap().to_string();
    for token in ["red", "blue"] {
        make_request(
            &app,
            Method::POST,
            &format!("/api/fields/{}/options", field_guid),
            Some(json!({ "value": token, "label": token })),
        )
        .await;
    }

    // Register a profile
    let (status, body) = make_request(
        &app,
        Method::POST,
        "/api/entities/profile",
        Some(json!({ "display_name": "Jo" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let profile_guid = body.unwrap()["guid"].as_str().unwrap().to_string();

    // An undeclared token is rejected, naming the field
    let (status, body) = make_request(
        &app,
        Method::POST,
        &format!("/api/values/profile/{}", profile_guid),
        Some(json!({ "values": { "favorite_color": "green" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert_eq!(body["error"], "VALIDATION");
    assert_eq!(body["field"], "favorite_color");

    // A declared token is accepted
    let (status, body) = make_request(
        &app,
        Method::POST,
        &format!("/api/values/profile/{}", profile_guid),
        Some(json!({ "values": { "favorite_color": "red" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["values"]["favorite_color"], "red");

    // And reads back
    let (status, body) = make_request(
        &app,
        Method::GET,
        &format!("/api/values/profile/{}", profile_guid),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["values"]["favorite_color"], "red");
}

#[tokio::test]
async fn test_values_for_unknown_profile_not_found() {
    let (app, _pool) = setup_test_app(0).await;

    let (status, _) = make_request(&app, Method::GET, "/api/values/profile/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_field_delete_conflict_and_cascade_through_api() {
    let (app, _pool) = setup_test_app(0).await;

    let (_, body) = make_request(
        &app,
        Method::POST,
        "/api/fields",
        Some(json!({
            "name": "bio",
            "label": "Bio",
            "field_type": "long_text",
            "applicability": "talent"
        })),
    )
    .await;
    let field_guid = body.unwrap()["guid"].as_str().unwrap().to_string();

    let (_, body) = make_request(
        &app,
        Method::POST,
        "/api/entities/profile",
        Some(json!({ "display_name": "Jo" })),
    )
    .await;
    let profile_guid = body.unwrap()["guid"].as_str().unwrap().to_string();

    make_request(
        &app,
        Method::POST,
        &format!("/api/values/profile/{}", profile_guid),
        Some(json!({ "values": { "bio": "Stage and screen." } })),
    )
    .await;

    // Plain delete conflicts while a value references the field
    let (status, _) = make_request(
        &app,
        Method::DELETE,
        &format!("/api/fields/{}", field_guid),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Cascade succeeds and the value disappears
    let (status, _) = make_request(
        &app,
        Method::DELETE,
        &format!("/api/fields/{}?cascade=true", field_guid),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = make_request(
        &app,
        Method::GET,
        &format!("/api/values/profile/{}", profile_guid),
        None,
    )
    .await;
    assert!(body.unwrap()["values"]
        .as_object()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_admin_routes_require_auth_when_secret_set() {
    let secret = 123456789i64;
    let (app, _pool) = setup_test_app(secret).await;

    let field_body = json!({
        "name": "eye_color",
        "label": "Eye color",
        "field_type": "short_text",
        "applicability": "talent"
    });

    // No timestamp/hash: rejected
    let (status, body) =
        make_request(&app, Method::POST, "/api/fields", Some(field_body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.unwrap()["error"], "UNAUTHORIZED");

    // Wrong hash: rejected
    let mut forged = signed(field_body.clone(), secret);
    forged["hash"] = json!("0000000000000000000000000000000000000000000000000000000000000000");
    let (status, _) = make_request(&app, Method::POST, "/api/fields", Some(forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Correctly signed: accepted
    let (status, _) =
        make_request(&app, Method::POST, "/api/fields", Some(signed(field_body, secret))).await;
    assert_eq!(status, StatusCode::CREATED);

    // Public routes stay open
    let (status, _) = make_request(&app, Method::GET, "/api/schema/talent", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_build_info_endpoint() {
    let (app, _pool) = setup_test_app(0).await;

    let (status, body) = make_request(&app, Method::GET, "/api/build_info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["module"], "callboard-ps");
}

/// Full startup path: init_database on disk seeds system fields, which the
/// schema endpoint then serves
#[tokio::test]
async fn test_seeded_system_fields_resolve_after_init() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("callboard.db");

    let pool = callboard_common::db::init_database(&db_path).await.unwrap();
    let state = AppState::new(pool, 0, true);
    let app = build_router(state);

    let (status, body) = make_request(&app, Method::GET, "/api/schema/talent", None).await;
    assert_eq!(status, StatusCode::OK);

    let body = body.unwrap();
    let names: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"stage_name"));
    assert!(names.contains(&"bio"));
    assert!(
        !names.contains(&"company_name"),
        "studio-scoped system field leaked into the talent schema"
    );
}
