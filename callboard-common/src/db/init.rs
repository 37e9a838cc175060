//! Database initialization
//!
//! Creates the schema on first run and upgrades settings/system fields
//! idempotently on every start. All services open the same callboard.db;
//! table creation is `IF NOT EXISTS` so startup order does not matter.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys (cascade deletes from fields to options/values
    // depend on this)
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; schema reads happen on
    // every form render while admins edit field definitions
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_settings_table(&pool).await?;
    create_users_table(&pool).await?;
    create_profiles_table(&pool).await?;
    create_studios_table(&pool).await?;
    create_fields_table(&pool).await?;
    create_field_options_table(&pool).await?;
    create_profile_field_values_table(&pool).await?;
    create_studio_field_values_table(&pool).await?;

    init_default_settings(&pool).await?;
    init_system_fields(&pool).await?;

    Ok(pool)
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profiles table (talent accounts)
///
/// The account service owns the full profile record; this subsystem only
/// needs a referential target for profile-scoped values.
pub async fn create_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            guid TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the studios table (studio accounts)
pub async fn create_studios_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studios (
            guid TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the fields table
///
/// One row per administrator-defined field. `name` uniqueness within the
/// applicability scope is enforced at the registry layer (both shares a
/// namespace with talent and studio, which a plain UNIQUE cannot express).
pub async fn create_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            label TEXT NOT NULL,
            description TEXT,
            field_type TEXT NOT NULL CHECK (field_type IN ('short_text', 'long_text', 'number', 'single_choice', 'multi_choice', 'boolean', 'date', 'email', 'url', 'phone')),
            applicability TEXT NOT NULL CHECK (applicability IN ('talent', 'studio', 'both')),
            required INTEGER NOT NULL DEFAULT 0,
            visible INTEGER NOT NULL DEFAULT 1,
            is_system INTEGER NOT NULL DEFAULT 0,
            default_value TEXT,
            placeholder TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            validation_rules TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (length(name) > 0 AND length(name) <= 64)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fields_name ON fields(name)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_fields_applicability ON fields(applicability, visible, sort_order)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the field_options table
///
/// Options are owned exclusively by their field and disappear with it.
pub async fn create_field_options_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS field_options (
            guid TEXT PRIMARY KEY,
            field_id TEXT NOT NULL REFERENCES fields(guid) ON DELETE CASCADE,
            value TEXT NOT NULL,
            label TEXT NOT NULL,
            color TEXT,
            sort_order INTEGER NOT NULL DEFAULT 0,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (field_id, value),
            CHECK (length(value) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_field_options_field ON field_options(field_id, sort_order)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the profile_field_values table
///
/// At most one value row per (profile, field) pair.
pub async fn create_profile_field_values_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile_field_values (
            guid TEXT PRIMARY KEY,
            profile_id TEXT NOT NULL REFERENCES profiles(guid) ON DELETE CASCADE,
            field_id TEXT NOT NULL REFERENCES fields(guid) ON DELETE CASCADE,
            value TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (profile_id, field_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_profile_values_field ON profile_field_values(field_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the studio_field_values table
///
/// At most one value row per (studio, field) pair.
pub async fn create_studio_field_values_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studio_field_values (
            guid TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL REFERENCES studios(guid) ON DELETE CASCADE,
            field_id TEXT NOT NULL REFERENCES fields(guid) ON DELETE CASCADE,
            value TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (studio_id, field_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_studio_values_field ON studio_field_values(field_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values, and resets
/// NULL values back to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // HTTP server settings
    ensure_setting(pool, "ps_listen_port", "5730").await?;
    ensure_setting(pool, "http_request_timeout_ms", "30000").await?;
    ensure_setting(pool, "http_max_body_size_bytes", "1048576").await?;

    // Schema resolver settings
    ensure_setting(pool, "schema_cache_enabled", "true").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization: multiple
        // services may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Seed system fields
///
/// System fields exist on every installation; administrators may edit their
/// label/visibility/ordering but never their name, type or applicability.
async fn init_system_fields(pool: &SqlitePool) -> Result<()> {
    ensure_system_field(pool, "stage_name", "Stage name", "short_text", "talent", 0).await?;
    ensure_system_field(pool, "bio", "Bio", "long_text", "both", 10).await?;
    ensure_system_field(pool, "location", "Location", "short_text", "both", 20).await?;
    ensure_system_field(pool, "website", "Website", "url", "both", 30).await?;
    ensure_system_field(pool, "company_name", "Company name", "short_text", "studio", 0).await?;

    Ok(())
}

/// Ensure a system field exists
///
/// Existing rows are left untouched so administrator edits to the mutable
/// attributes survive restarts.
async fn ensure_system_field(
    pool: &SqlitePool,
    name: &str,
    label: &str,
    field_type: &str,
    applicability: &str,
    sort_order: i64,
) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM fields WHERE name = ? AND applicability = ? AND is_system = 1)",
    )
    .bind(name)
    .bind(applicability)
    .fetch_one(pool)
    .await?;

    if !exists {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO fields (guid, name, label, field_type, applicability, is_system, sort_order)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(label)
        .bind(field_type)
        .bind(applicability)
        .bind(sort_order)
        .execute(pool)
        .await?;

        info!("Seeded system field '{}' ({})", name, applicability);
    }

    Ok(())
}
