//! Option Registry
//!
//! Options belong exclusively to one enumerated field. Ordering is by
//! explicit sort_order with creation order (rowid) breaking ties, so two
//! options created with the same sort_order render in insertion order.

use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use callboard_common::db::models::{EntityKind, Field, FieldOption, FieldType};
use callboard_common::{Error, Result};

use super::fields::get_field;

const MAX_TOKEN_LEN: usize = 64;

/// Request payload for creating an option
#[derive(Debug, Clone, Deserialize)]
pub struct OptionSpec {
    /// Stable token stored in values
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub is_default: bool,
}

/// Request payload for updating an option; absent fields are unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionPatch {
    pub value: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i64>,
    pub is_default: Option<bool>,
}

/// Validate an option value token: letters, digits, underscore, hyphen
fn validate_token(field_name: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(Error::validation(field_name, "Option value must not be empty"));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(Error::validation(
            field_name,
            format!("Option value exceeds {} characters", MAX_TOKEN_LEN),
        ));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::validation(
            field_name,
            "Option value may only contain letters, digits, underscores and hyphens",
        ));
    }
    Ok(())
}

/// Create an option under an enumerated field
pub async fn create_option(
    pool: &SqlitePool,
    field_guid: &str,
    spec: &OptionSpec,
) -> Result<FieldOption> {
    let field = get_field(pool, field_guid).await?;

    if !field.field_type.is_choice() {
        return Err(Error::validation(
            &field.name,
            format!(
                "Field '{}' has type {}, which does not take options",
                field.name,
                field.field_type.as_str()
            ),
        ));
    }

    validate_token(&field.name, &spec.value)?;

    let duplicate: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM field_options WHERE field_id = ? AND value = ?")
            .bind(field_guid)
            .bind(&spec.value)
            .fetch_one(pool)
            .await?;
    if duplicate > 0 {
        return Err(Error::Conflict(format!(
            "Field '{}' already has an option with value '{}'",
            field.name, spec.value
        )));
    }

    let guid = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO field_options (guid, field_id, value, label, color, sort_order, is_default)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(field_guid)
    .bind(&spec.value)
    .bind(&spec.label)
    .bind(&spec.color)
    .bind(spec.sort_order)
    .bind(spec.is_default)
    .execute(pool)
    .await?;

    get_option(pool, &guid).await
}

/// Fetch an option by guid
pub async fn get_option(pool: &SqlitePool, guid: &str) -> Result<FieldOption> {
    let row = sqlx::query("SELECT * FROM field_options WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Option {}", guid)))?;

    Ok(option_from_row(&row))
}

/// List a field's options in display order
pub async fn list_options(pool: &SqlitePool, field_guid: &str) -> Result<Vec<FieldOption>> {
    let rows = sqlx::query(
        "SELECT * FROM field_options WHERE field_id = ? ORDER BY sort_order, rowid",
    )
    .bind(field_guid)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(option_from_row).collect())
}

/// Update an option
///
/// Changing the value token is refused while stored values reference it;
/// re-pointing stored data is a cascade delete plus re-create, not a rename.
pub async fn update_option(
    pool: &SqlitePool,
    guid: &str,
    patch: &OptionPatch,
) -> Result<FieldOption> {
    let current = get_option(pool, guid).await?;
    let field = get_field(pool, &current.field_id).await?;

    let value = patch.value.clone().unwrap_or_else(|| current.value.clone());
    if value != current.value {
        validate_token(&field.name, &value)?;

        let references = token_reference_count(pool, &field, &current.value).await?;
        if references > 0 {
            return Err(Error::Conflict(format!(
                "Option '{}' of field '{}' is referenced by {} stored value(s) and cannot be renamed",
                current.value, field.name, references
            )));
        }

        let duplicate: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM field_options WHERE field_id = ? AND value = ? AND guid != ?",
        )
        .bind(&current.field_id)
        .bind(&value)
        .bind(guid)
        .fetch_one(pool)
        .await?;
        if duplicate > 0 {
            return Err(Error::Conflict(format!(
                "Field '{}' already has an option with value '{}'",
                field.name, value
            )));
        }
    }

    sqlx::query(
        r#"
        UPDATE field_options SET value = ?, label = ?, color = ?, sort_order = ?, is_default = ?
        WHERE guid = ?
        "#,
    )
    .bind(&value)
    .bind(patch.label.as_ref().unwrap_or(&current.label))
    .bind(patch.color.clone().or_else(|| current.color.clone()))
    .bind(patch.sort_order.unwrap_or(current.sort_order))
    .bind(patch.is_default.unwrap_or(current.is_default))
    .bind(guid)
    .execute(pool)
    .await?;

    get_option(pool, guid).await
}

/// Delete an option
///
/// Fails with Conflict while stored values reference the token, unless
/// cascade is requested. Cascade removes single-choice value rows and
/// strips the token out of multi-choice selections (dropping rows that
/// become empty).
pub async fn delete_option(pool: &SqlitePool, guid: &str, cascade: bool) -> Result<()> {
    let option = get_option(pool, guid).await?;
    let field = get_field(pool, &option.field_id).await?;

    let references = token_reference_count(pool, &field, &option.value).await?;
    if references > 0 && !cascade {
        return Err(Error::Conflict(format!(
            "Option '{}' of field '{}' is referenced by {} stored value(s); pass cascade to remove them",
            option.value, field.name, references
        )));
    }

    let mut tx = pool.begin().await?;

    if references > 0 {
        for kind in [EntityKind::Profile, EntityKind::Studio] {
            match field.field_type {
                FieldType::SingleChoice => {
                    let sql = format!(
                        "DELETE FROM {} WHERE field_id = ? AND value = ?",
                        kind.values_table()
                    );
                    sqlx::query(&sql)
                        .bind(&field.guid)
                        .bind(&option.value)
                        .execute(&mut *tx)
                        .await?;
                }
                FieldType::MultiChoice => {
                    strip_token_from_selections(&mut tx, kind, &field.guid, &option.value).await?;
                }
                _ => {}
            }
        }
    }

    sqlx::query("DELETE FROM field_options WHERE guid = ?")
        .bind(guid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Rewrite a field's option ordering in one transaction
///
/// `ordered_guids` must list every option of the field exactly once.
pub async fn reorder_options(
    pool: &SqlitePool,
    field_guid: &str,
    ordered_guids: &[String],
) -> Result<Vec<FieldOption>> {
    let field = get_field(pool, field_guid).await?;
    let existing = list_options(pool, field_guid).await?;

    let mut expected: Vec<&str> = existing.iter().map(|o| o.guid.as_str()).collect();
    expected.sort_unstable();
    let mut provided: Vec<&str> = ordered_guids.iter().map(String::as_str).collect();
    provided.sort_unstable();
    if expected != provided {
        return Err(Error::validation(
            &field.name,
            "Reorder list must contain each option of the field exactly once",
        ));
    }

    let mut tx = pool.begin().await?;
    for (index, guid) in ordered_guids.iter().enumerate() {
        sqlx::query("UPDATE field_options SET sort_order = ? WHERE guid = ?")
            .bind(index as i64 * 10)
            .bind(guid)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    list_options(pool, field_guid).await
}

/// Count stored values referencing an option token, across both entity kinds
async fn token_reference_count(pool: &SqlitePool, field: &Field, token: &str) -> Result<i64> {
    let mut total = 0i64;

    for kind in [EntityKind::Profile, EntityKind::Studio] {
        let sql = match field.field_type {
            FieldType::SingleChoice => format!(
                "SELECT COUNT(*) FROM {} WHERE field_id = ? AND value = ?",
                kind.values_table()
            ),
            FieldType::MultiChoice => {
                // Tokens are a restricted charset, so a quoted LIKE match
                // against the JSON array cannot false-positive on substrings
                format!(
                    "SELECT COUNT(*) FROM {} WHERE field_id = ? AND value LIKE ?",
                    kind.values_table()
                )
            }
            _ => return Ok(0),
        };

        let count: i64 = match field.field_type {
            FieldType::MultiChoice => sqlx::query_scalar(&sql)
                .bind(&field.guid)
                .bind(format!("%\"{}\"%", token))
                .fetch_one(pool)
                .await?,
            _ => sqlx::query_scalar(&sql)
                .bind(&field.guid)
                .bind(token)
                .fetch_one(pool)
                .await?,
        };
        total += count;
    }

    Ok(total)
}

/// Remove a token from every multi-choice selection of a field, deleting
/// rows whose selection becomes empty
async fn strip_token_from_selections(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    kind: EntityKind,
    field_guid: &str,
    token: &str,
) -> Result<()> {
    let select_sql = format!(
        "SELECT guid, value FROM {} WHERE field_id = ? AND value LIKE ?",
        kind.values_table()
    );
    let rows: Vec<(String, String)> = sqlx::query_as(&select_sql)
        .bind(field_guid)
        .bind(format!("%\"{}\"%", token))
        .fetch_all(&mut **tx)
        .await?;

    for (row_guid, raw) in rows {
        let mut tokens: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            Error::Internal(format!("Corrupt multi_choice value {}: {}", row_guid, e))
        })?;
        tokens.retain(|t| t != token);

        if tokens.is_empty() {
            let sql = format!("DELETE FROM {} WHERE guid = ?", kind.values_table());
            sqlx::query(&sql).bind(&row_guid).execute(&mut **tx).await?;
        } else {
            let sql = format!(
                "UPDATE {} SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
                kind.values_table()
            );
            let encoded = serde_json::to_string(&tokens)
                .map_err(|e| Error::Internal(format!("Failed to encode tokens: {}", e)))?;
            sqlx::query(&sql)
                .bind(encoded)
                .bind(&row_guid)
                .execute(&mut **tx)
                .await?;
        }
    }

    Ok(())
}

/// Map a field_options row into the shared model
pub fn option_from_row(row: &SqliteRow) -> FieldOption {
    FieldOption {
        guid: row.get("guid"),
        field_id: row.get("field_id"),
        value: row.get("value"),
        label: row.get("label"),
        color: row.get("color"),
        sort_order: row.get("sort_order"),
        is_default: row.get::<i64, _>("is_default") != 0,
    }
}
