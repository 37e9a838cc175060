//! Owner-row helpers for profiles and studios
//!
//! The account service owns these records; this service registers the row
//! when an account is created (so value writes have a referential target)
//! and otherwise only checks existence.

use sqlx::SqlitePool;
use uuid::Uuid;

use callboard_common::db::models::EntityKind;
use callboard_common::{Error, Result};

/// Whether an owner row exists for the given kind
pub async fn entity_exists(pool: &SqlitePool, kind: EntityKind, guid: &str) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE guid = ?)",
        kind.owner_table()
    );
    let exists: bool = sqlx::query_scalar(&sql).bind(guid).fetch_one(pool).await?;
    Ok(exists)
}

/// Register an owner row, generating a guid when none is supplied
///
/// Fails with Conflict if the guid is already registered.
pub async fn create_entity(
    pool: &SqlitePool,
    kind: EntityKind,
    guid: Option<String>,
    display_name: &str,
) -> Result<String> {
    if display_name.trim().is_empty() {
        return Err(Error::validation(
            "display_name",
            "Display name must not be empty",
        ));
    }

    let guid = guid.unwrap_or_else(|| Uuid::new_v4().to_string());

    if entity_exists(pool, kind, &guid).await? {
        return Err(Error::Conflict(format!(
            "{} {} is already registered",
            kind.as_str(),
            guid
        )));
    }

    let sql = format!(
        "INSERT INTO {} (guid, display_name) VALUES (?, ?)",
        kind.owner_table()
    );
    sqlx::query(&sql)
        .bind(&guid)
        .bind(display_name)
        .execute(pool)
        .await?;

    Ok(guid)
}
