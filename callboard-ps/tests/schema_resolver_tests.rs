//! Integration tests for the schema resolver and its cache

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use callboard_common::db::init::{
    create_field_options_table, create_fields_table, create_profile_field_values_table,
    create_profiles_table, create_studio_field_values_table, create_studios_table,
};
use callboard_common::db::models::{Applicability, FieldType, TenantType};
use callboard_ps::registry::{self, FieldSpec, OptionSpec};
use callboard_ps::resolver::{resolve_schema, SchemaCache};

/// In-memory test database
///
/// Single connection: pooled in-memory SQLite gives each connection its
/// own database, so the pool must not grow past one.
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    create_profiles_table(&pool).await.unwrap();
    create_studios_table(&pool).await.unwrap();
    create_fields_table(&pool).await.unwrap();
    create_field_options_table(&pool).await.unwrap();
    create_profile_field_values_table(&pool).await.unwrap();
    create_studio_field_values_table(&pool).await.unwrap();

    pool
}

async fn make_field(pool: &SqlitePool, spec: FieldSpec) -> callboard_common::db::models::Field {
    registry::create_field(pool, &spec).await.unwrap()
}

fn spec(
    name: &str,
    applicability: Applicability,
    visible: bool,
    sort_order: i64,
) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        label: name.to_string(),
        description: None,
        field_type: FieldType::ShortText,
        applicability,
        required: false,
        visible,
        default_value: None,
        placeholder: None,
        sort_order,
        validation_rules: None,
    }
}

#[tokio::test]
async fn test_invisible_fields_never_resolve() {
    let pool = setup_test_db().await;

    make_field(&pool, spec("shown", Applicability::Talent, true, 0)).await;
    make_field(&pool, spec("hidden", Applicability::Talent, false, 0)).await;

    let schema = resolve_schema(&pool, TenantType::Talent).await.unwrap();
    let names: Vec<&str> = schema.iter().map(|f| f.field.name.as_str()).collect();
    assert_eq!(names, ["shown"]);
}

#[tokio::test]
async fn test_applicability_filtering() {
    let pool = setup_test_db().await;

    make_field(&pool, spec("talent_only", Applicability::Talent, true, 0)).await;
    make_field(&pool, spec("studio_only", Applicability::Studio, true, 1)).await;
    make_field(&pool, spec("shared", Applicability::Both, true, 2)).await;

    let talent = resolve_schema(&pool, TenantType::Talent).await.unwrap();
    let names: Vec<&str> = talent.iter().map(|f| f.field.name.as_str()).collect();
    assert_eq!(names, ["talent_only", "shared"]);

    let studio = resolve_schema(&pool, TenantType::Studio).await.unwrap();
    let names: Vec<&str> = studio.iter().map(|f| f.field.name.as_str()).collect();
    assert_eq!(names, ["studio_only", "shared"]);
}

#[tokio::test]
async fn test_fields_ordered_by_sort_order() {
    let pool = setup_test_db().await;

    make_field(&pool, spec("third", Applicability::Talent, true, 30)).await;
    make_field(&pool, spec("first", Applicability::Talent, true, 10)).await;
    make_field(&pool, spec("second", Applicability::Talent, true, 20)).await;

    let schema = resolve_schema(&pool, TenantType::Talent).await.unwrap();
    let names: Vec<&str> = schema.iter().map(|f| f.field.name.as_str()).collect();
    assert_eq!(names, ["first", "second", "third"]);
}

#[tokio::test]
async fn test_options_attached_in_display_order() {
    let pool = setup_test_db().await;

    let mut choice = spec("hair_color", Applicability::Talent, true, 0);
    choice.field_type = FieldType::SingleChoice;
    let field = make_field(&pool, choice).await;

    for (token, order) in [("blonde", 20), ("black", 0), ("brown", 10)] {
        registry::create_option(
            &pool,
            &field.guid,
            &OptionSpec {
                value: token.to_string(),
                label: token.to_string(),
                color: None,
                sort_order: order,
                is_default: false,
            },
        )
        .await
        .unwrap();
    }

    let schema = resolve_schema(&pool, TenantType::Talent).await.unwrap();
    let tokens: Vec<&str> = schema[0].options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(tokens, ["black", "brown", "blonde"]);
}

#[tokio::test]
async fn test_cache_serves_hits_and_invalidates() {
    let pool = setup_test_db().await;
    let cache = SchemaCache::new(true);

    make_field(&pool, spec("original", Applicability::Talent, true, 0)).await;

    let first = cache.resolve(&pool, TenantType::Talent).await.unwrap();
    assert_eq!(first.len(), 1);

    // A second field appears in the database but not in the cached schema
    make_field(&pool, spec("added_later", Applicability::Talent, true, 1)).await;
    let cached = cache.resolve(&pool, TenantType::Talent).await.unwrap();
    assert_eq!(cached.len(), 1, "cache should still serve the old schema");

    // After invalidation the new field is visible
    cache.invalidate().await;
    let fresh = cache.resolve(&pool, TenantType::Talent).await.unwrap();
    assert_eq!(fresh.len(), 2);
}

#[tokio::test]
async fn test_disabled_cache_always_resolves() {
    let pool = setup_test_db().await;
    let cache = SchemaCache::new(false);

    make_field(&pool, spec("original", Applicability::Talent, true, 0)).await;
    assert_eq!(cache.resolve(&pool, TenantType::Talent).await.unwrap().len(), 1);

    make_field(&pool, spec("added_later", Applicability::Talent, true, 1)).await;
    assert_eq!(
        cache.resolve(&pool, TenantType::Talent).await.unwrap().len(),
        2,
        "disabled cache must read through on every call"
    );
}

#[tokio::test]
async fn test_cache_keys_tenant_types_separately() {
    let pool = setup_test_db().await;
    let cache = SchemaCache::new(true);

    make_field(&pool, spec("talent_only", Applicability::Talent, true, 0)).await;
    make_field(&pool, spec("studio_only", Applicability::Studio, true, 0)).await;

    let talent = cache.resolve(&pool, TenantType::Talent).await.unwrap();
    let studio = cache.resolve(&pool, TenantType::Studio).await.unwrap();

    assert_eq!(talent[0].field.name, "talent_only");
    assert_eq!(studio[0].field.name, "studio_only");
}
