//! Field Registry
//!
//! Create/update/delete of field definitions. Names are identifiers unique
//! within their applicability scope (a `both` field shares its name with
//! talent and studio scopes). System fields keep their name, type and
//! applicability for life.

use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use callboard_common::db::models::{Applicability, Field, FieldType, ValidationRules};
use callboard_common::{Error, Result};

/// Maximum identifier length for field names
const MAX_NAME_LEN: usize = 64;

/// Request payload for creating a field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    pub field_type: FieldType,
    pub applicability: Applicability,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub validation_rules: Option<ValidationRules>,
}

fn default_visible() -> bool {
    true
}

/// Request payload for updating a field; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub label: Option<String>,
    /// Some(None) clears the description
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    pub field_type: Option<FieldType>,
    pub applicability: Option<Applicability>,
    pub required: Option<bool>,
    pub visible: Option<bool>,
    #[serde(default, with = "double_option")]
    pub default_value: Option<Option<String>>,
    #[serde(default, with = "double_option")]
    pub placeholder: Option<Option<String>>,
    pub sort_order: Option<i64>,
    #[serde(default, with = "double_option")]
    pub validation_rules: Option<Option<ValidationRules>>,
}

/// Distinguishes "field absent" from "field present but null" in PATCH
/// bodies: absent keys deserialize to None, explicit null to Some(None).
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

/// Validate a field name: letters, digits and underscores, not starting
/// with a digit
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation(name, "Field name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::validation(
            name,
            format!("Field name exceeds {} characters", MAX_NAME_LEN),
        ));
    }
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(Error::validation(name, "Field name must not start with a digit"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::validation(
            name,
            "Field name may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

/// Create a field definition
pub async fn create_field(pool: &SqlitePool, spec: &FieldSpec) -> Result<Field> {
    validate_field_name(&spec.name)?;

    if name_collides(pool, &spec.name, spec.applicability, None).await? {
        return Err(Error::validation(
            &spec.name,
            format!(
                "A field named '{}' already exists in the {} scope",
                spec.name,
                spec.applicability.as_str()
            ),
        ));
    }

    let guid = Uuid::new_v4().to_string();
    let rules_blob = encode_rules(spec.validation_rules.as_ref())?;

    sqlx::query(
        r#"
        INSERT INTO fields (
            guid, name, label, description, field_type, applicability,
            required, visible, is_system, default_value, placeholder,
            sort_order, validation_rules
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&spec.name)
    .bind(&spec.label)
    .bind(&spec.description)
    .bind(spec.field_type.as_str())
    .bind(spec.applicability.as_str())
    .bind(spec.required)
    .bind(spec.visible)
    .bind(&spec.default_value)
    .bind(&spec.placeholder)
    .bind(spec.sort_order)
    .bind(&rules_blob)
    .execute(pool)
    .await?;

    get_field(pool, &guid).await
}

/// Fetch a field by guid
pub async fn get_field(pool: &SqlitePool, guid: &str) -> Result<Field> {
    let row = sqlx::query("SELECT * FROM fields WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Field {}", guid)))?;

    field_from_row(&row)
}

/// List all field definitions, admin view (includes invisible fields)
pub async fn list_fields(pool: &SqlitePool) -> Result<Vec<Field>> {
    let rows = sqlx::query("SELECT * FROM fields ORDER BY applicability, sort_order, guid")
        .fetch_all(pool)
        .await?;

    rows.iter().map(field_from_row).collect()
}

/// Update a field definition
///
/// System fields reject changes to name, type and applicability. Name or
/// applicability changes re-check scope uniqueness against other fields.
pub async fn update_field(pool: &SqlitePool, guid: &str, patch: &FieldPatch) -> Result<Field> {
    let current = get_field(pool, guid).await?;

    if current.is_system {
        let renames = patch.name.as_ref().is_some_and(|n| *n != current.name);
        let retypes = patch.field_type.is_some_and(|t| t != current.field_type);
        let rescopes = patch
            .applicability
            .is_some_and(|a| a != current.applicability);
        if renames || retypes || rescopes {
            return Err(Error::validation(
                &current.name,
                "System fields cannot change name, type or applicability",
            ));
        }
    }

    let name = patch.name.clone().unwrap_or_else(|| current.name.clone());
    let field_type = patch.field_type.unwrap_or(current.field_type);
    let applicability = patch.applicability.unwrap_or(current.applicability);

    validate_field_name(&name)?;

    if name != current.name || applicability != current.applicability {
        if name_collides(pool, &name, applicability, Some(guid)).await? {
            return Err(Error::validation(
                &name,
                format!(
                    "A field named '{}' already exists in the {} scope",
                    name,
                    applicability.as_str()
                ),
            ));
        }
    }

    let description = patch
        .description
        .clone()
        .unwrap_or_else(|| current.description.clone());
    let default_value = patch
        .default_value
        .clone()
        .unwrap_or_else(|| current.default_value.clone());
    let placeholder = patch
        .placeholder
        .clone()
        .unwrap_or_else(|| current.placeholder.clone());
    let rules_blob = match &patch.validation_rules {
        Some(rules) => encode_rules(rules.as_ref())?,
        None => current.validation_rules.clone(),
    };

    sqlx::query(
        r#"
        UPDATE fields SET
            name = ?, label = ?, description = ?, field_type = ?,
            applicability = ?, required = ?, visible = ?, default_value = ?,
            placeholder = ?, sort_order = ?, validation_rules = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&name)
    .bind(patch.label.as_ref().unwrap_or(&current.label))
    .bind(&description)
    .bind(field_type.as_str())
    .bind(applicability.as_str())
    .bind(patch.required.unwrap_or(current.required))
    .bind(patch.visible.unwrap_or(current.visible))
    .bind(&default_value)
    .bind(&placeholder)
    .bind(patch.sort_order.unwrap_or(current.sort_order))
    .bind(&rules_blob)
    .bind(guid)
    .execute(pool)
    .await?;

    get_field(pool, guid).await
}

/// Delete a field definition
///
/// Fails with Conflict while stored values reference the field, unless
/// cascade is requested; cascade relies on the FK ON DELETE CASCADE to
/// remove options and values with the field.
pub async fn delete_field(pool: &SqlitePool, guid: &str, cascade: bool) -> Result<()> {
    // Existence check first so a missing field is NotFound, not Conflict
    let field = get_field(pool, guid).await?;

    let references = value_reference_count(pool, guid).await?;
    if references > 0 && !cascade {
        return Err(Error::Conflict(format!(
            "Field '{}' still has {} stored value(s); pass cascade to delete them",
            field.name, references
        )));
    }

    sqlx::query("DELETE FROM fields WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    Ok(())
}

/// Count stored values (across both entity kinds) referencing a field
pub async fn value_reference_count(pool: &SqlitePool, field_guid: &str) -> Result<i64> {
    let profile_refs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM profile_field_values WHERE field_id = ?")
            .bind(field_guid)
            .fetch_one(pool)
            .await?;
    let studio_refs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM studio_field_values WHERE field_id = ?")
            .bind(field_guid)
            .fetch_one(pool)
            .await?;

    Ok(profile_refs + studio_refs)
}

/// Whether a name is already taken in an overlapping applicability scope
async fn name_collides(
    pool: &SqlitePool,
    name: &str,
    applicability: Applicability,
    exclude_guid: Option<&str>,
) -> Result<bool> {
    // `both` collides with everything; talent/studio collide with their own
    // scope and with `both`
    let sql = match applicability {
        Applicability::Both => {
            "SELECT COUNT(*) FROM fields WHERE name = ? AND guid != ?"
        }
        Applicability::Talent => {
            "SELECT COUNT(*) FROM fields WHERE name = ? AND guid != ? AND applicability IN ('talent', 'both')"
        }
        Applicability::Studio => {
            "SELECT COUNT(*) FROM fields WHERE name = ? AND guid != ? AND applicability IN ('studio', 'both')"
        }
    };

    let count: i64 = sqlx::query_scalar(sql)
        .bind(name)
        .bind(exclude_guid.unwrap_or(""))
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}

fn encode_rules(rules: Option<&ValidationRules>) -> Result<Option<String>> {
    match rules {
        None => Ok(None),
        Some(r) if r.is_empty() => Ok(None),
        Some(r) => serde_json::to_string(r)
            .map(Some)
            .map_err(|e| Error::Internal(format!("Failed to serialize validation rules: {}", e))),
    }
}

/// Map a fields row into the shared model
pub fn field_from_row(row: &SqliteRow) -> Result<Field> {
    let type_str: String = row.get("field_type");
    let field_type = FieldType::from_str(&type_str)
        .ok_or_else(|| Error::Internal(format!("Unknown field_type in database: {}", type_str)))?;

    let app_str: String = row.get("applicability");
    let applicability = Applicability::from_str(&app_str)
        .ok_or_else(|| Error::Internal(format!("Unknown applicability in database: {}", app_str)))?;

    Ok(Field {
        guid: row.get("guid"),
        name: row.get("name"),
        label: row.get("label"),
        description: row.get("description"),
        field_type,
        applicability,
        required: row.get::<i64, _>("required") != 0,
        visible: row.get::<i64, _>("visible") != 0,
        is_system: row.get::<i64, _>("is_system") != 0,
        default_value: row.get("default_value"),
        placeholder: row.get("placeholder"),
        sort_order: row.get("sort_order"),
        validation_rules: row.get("validation_rules"),
    })
}
