//! Schema Resolver
//!
//! Assembles the ordered, visible field list (with options) for a tenant
//! type. Resolution is a pure read over committed rows; the cache in front
//! of it is owned by AppState and invalidated by every registry mutation,
//! never consulted across an invalidation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use callboard_common::db::models::{Field, FieldOption, TenantType};
use callboard_common::Result;

use crate::registry::fields::field_from_row;
use crate::registry::options::option_from_row;

/// One field of a resolved schema, with its option set when enumerated
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    #[serde(flatten)]
    pub field: Field,
    pub options: Vec<FieldOption>,
}

/// Resolve the form schema for a tenant type
///
/// Returns visible fields whose applicability matches the tenant type or is
/// `both`, ordered by sort_order (guid as tiebreak), each joined with its
/// options in display order.
pub async fn resolve_schema(pool: &SqlitePool, tenant: TenantType) -> Result<Vec<ResolvedField>> {
    let field_rows = sqlx::query(
        r#"
        SELECT * FROM fields
        WHERE visible = 1 AND applicability IN (?, 'both')
        ORDER BY sort_order, guid
        "#,
    )
    .bind(tenant.as_str())
    .fetch_all(pool)
    .await?;

    let fields: Vec<Field> = field_rows
        .iter()
        .map(field_from_row)
        .collect::<Result<_>>()?;

    // One pass over all options of the visible fields, grouped by field
    let option_rows = sqlx::query(
        r#"
        SELECT o.* FROM field_options o
        JOIN fields f ON f.guid = o.field_id
        WHERE f.visible = 1 AND f.applicability IN (?, 'both')
        ORDER BY o.sort_order, o.rowid
        "#,
    )
    .bind(tenant.as_str())
    .fetch_all(pool)
    .await?;

    let mut options_by_field: HashMap<String, Vec<FieldOption>> = HashMap::new();
    for row in &option_rows {
        let option = option_from_row(row);
        options_by_field
            .entry(option.field_id.clone())
            .or_default()
            .push(option);
    }

    Ok(fields
        .into_iter()
        .map(|field| {
            let options = options_by_field.remove(&field.guid).unwrap_or_default();
            ResolvedField { field, options }
        })
        .collect())
}

/// Read-through cache of resolved schemas, keyed by tenant type
///
/// Schema reads happen on every profile-edit render; field definitions
/// change a few times a month. Registry mutations call [`invalidate`],
/// which drops every entry.
///
/// [`invalidate`]: SchemaCache::invalidate
pub struct SchemaCache {
    enabled: bool,
    inner: RwLock<HashMap<TenantType, Arc<Vec<ResolvedField>>>>,
}

impl SchemaCache {
    pub fn new(enabled: bool) -> Self {
        SchemaCache {
            enabled,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the resolved schema, hitting the database only on a cache miss
    pub async fn resolve(
        &self,
        pool: &SqlitePool,
        tenant: TenantType,
    ) -> Result<Arc<Vec<ResolvedField>>> {
        if !self.enabled {
            return Ok(Arc::new(resolve_schema(pool, tenant).await?));
        }

        if let Some(schema) = self.inner.read().await.get(&tenant) {
            return Ok(Arc::clone(schema));
        }

        let resolved = Arc::new(resolve_schema(pool, tenant).await?);

        // Two concurrent misses both resolve; last insert wins, both results
        // reflect committed rows
        self.inner
            .write()
            .await
            .insert(tenant, Arc::clone(&resolved));

        Ok(resolved)
    }

    /// Drop all cached schemas; called after every field/option mutation
    pub async fn invalidate(&self) {
        self.inner.write().await.clear();
    }
}
