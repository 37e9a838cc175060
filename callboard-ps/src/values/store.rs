//! Value Store
//!
//! One row per (entity, field) pair, enforced by a UNIQUE constraint and
//! written through `INSERT ... ON CONFLICT DO UPDATE`. A whole submission
//! validates before anything is written, and all of its writes share one
//! transaction, so a rejected or failed submission leaves stored values
//! untouched.

use std::collections::{BTreeMap, HashMap};

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use callboard_common::db::models::{EntityKind, Field, FieldType};
use callboard_common::{Error, FieldValue, Result};

use crate::db::entities::entity_exists;
use crate::registry::fields::field_from_row;
use crate::registry::options::list_options;
use crate::values::validate::{validate_submission, WriteOp};

/// Read all stored values for an entity, decoded per field type
///
/// Keys are field names. Values whose field has been deleted no longer
/// exist (FK cascade), so every row decodes against a live definition.
pub async fn get_values(
    pool: &SqlitePool,
    kind: EntityKind,
    entity_guid: &str,
) -> Result<BTreeMap<String, FieldValue>> {
    if !entity_exists(pool, kind, entity_guid).await? {
        return Err(Error::NotFound(format!(
            "{} {}",
            kind.as_str(),
            entity_guid
        )));
    }

    let sql = format!(
        r#"
        SELECT f.name, f.field_type, v.value
        FROM {table} v
        JOIN fields f ON f.guid = v.field_id
        WHERE v.{owner} = ?
        "#,
        table = kind.values_table(),
        owner = kind.owner_column(),
    );

    let rows = sqlx::query(&sql).bind(entity_guid).fetch_all(pool).await?;

    let mut values = BTreeMap::new();
    for row in rows {
        let name: String = row.get("name");
        let type_str: String = row.get("field_type");
        let raw: String = row.get("value");

        let field_type = FieldType::from_str(&type_str).ok_or_else(|| {
            Error::Internal(format!("Unknown field_type in database: {}", type_str))
        })?;

        let decoded = FieldValue::decode(&name, field_type, &raw)?;
        values.insert(name, decoded);
    }

    Ok(values)
}

/// Validate and store a submission for an entity
///
/// Every submitted value is validated against its field definition first;
/// the first failure aborts the call with a Validation error naming the
/// field and nothing is written. On success each field is upserted (or
/// cleared) inside a single transaction.
pub async fn set_values(
    pool: &SqlitePool,
    kind: EntityKind,
    entity_guid: &str,
    submissions: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    if !entity_exists(pool, kind, entity_guid).await? {
        return Err(Error::NotFound(format!(
            "{} {}",
            kind.as_str(),
            entity_guid
        )));
    }

    let fields_by_name = applicable_fields(pool, kind).await?;

    // Validate the full submission before touching the database
    let mut ops: Vec<(&Field, WriteOp)> = Vec::with_capacity(submissions.len());
    for (name, submitted) in submissions {
        let field = fields_by_name.get(name.as_str()).ok_or_else(|| {
            Error::validation(
                name,
                format!("No {} field named '{}'", kind.tenant_type().as_str(), name),
            )
        })?;

        let options = if field.field_type.is_choice() {
            list_options(pool, &field.guid).await?
        } else {
            Vec::new()
        };

        let op = validate_submission(field, &options, submitted)?;
        ops.push((field, op));
    }

    let mut tx = pool.begin().await?;

    let upsert_sql = format!(
        r#"
        INSERT INTO {table} (guid, {owner}, field_id, value)
        VALUES (?, ?, ?, ?)
        ON CONFLICT({owner}, field_id)
        DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
        table = kind.values_table(),
        owner = kind.owner_column(),
    );
    let clear_sql = format!(
        "DELETE FROM {table} WHERE {owner} = ? AND field_id = ?",
        table = kind.values_table(),
        owner = kind.owner_column(),
    );

    for (field, op) in ops {
        match op {
            WriteOp::Set(value) => {
                sqlx::query(&upsert_sql)
                    .bind(Uuid::new_v4().to_string())
                    .bind(entity_guid)
                    .bind(&field.guid)
                    .bind(value.encode())
                    .execute(&mut *tx)
                    .await?;
            }
            WriteOp::Clear => {
                sqlx::query(&clear_sql)
                    .bind(entity_guid)
                    .bind(&field.guid)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;
    Ok(())
}

/// All field definitions applicable to an entity kind, by name
///
/// Includes invisible fields: hiding a field stops it rendering, not the
/// entity's existing data flowing through imports and admin tooling.
async fn applicable_fields(
    pool: &SqlitePool,
    kind: EntityKind,
) -> Result<HashMap<String, Field>> {
    let rows = sqlx::query("SELECT * FROM fields WHERE applicability IN (?, 'both')")
        .bind(kind.tenant_type().as_str())
        .fetch_all(pool)
        .await?;

    let mut by_name = HashMap::with_capacity(rows.len());
    for row in &rows {
        let field = field_from_row(row)?;
        by_name.insert(field.name.clone(), field);
    }

    Ok(by_name)
}
