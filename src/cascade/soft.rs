//! Soft delete: mark a record inactive instead of removing it.

use sqlx::SqlitePool;
use tracing::info;

use super::report::DeactivationOutcome;
use super::CascadeError;
use crate::graph::EntitySpec;
use crate::ident::Ident;
use crate::rows::row_to_value;
use crate::schema::SchemaCatalog;

/// Set whichever soft-status columns of `spec` exist in the live schema.
pub async fn deactivate(
    pool: &SqlitePool,
    catalog: &SchemaCatalog,
    spec: &EntitySpec,
    record_id: &str,
) -> Result<DeactivationOutcome, CascadeError> {
    let unsupported = || CascadeError::SoftDeleteUnsupported {
        entity: spec.table.clone(),
    };
    let soft = spec.soft_status.as_ref().ok_or_else(unsupported)?;

    let mut assignments = Vec::new();
    let mut columns = Vec::new();
    let mut status_value = None;
    if let Some(column) = soft.status_column.as_deref() {
        if catalog.has_column(&spec.table, column) {
            assignments.push(format!("{} = ?1", Ident::new(column)?));
            columns.push(column.to_string());
            status_value = Some(soft.inactive_value.as_str());
        }
    }
    if let Some(column) = soft.active_flag_column.as_deref() {
        if catalog.has_column(&spec.table, column) {
            assignments.push(format!("{} = 0", Ident::new(column)?));
            columns.push(column.to_string());
        }
    }
    if assignments.is_empty() {
        return Err(unsupported());
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?2 RETURNING *",
        Ident::new(&spec.table)?,
        assignments.join(", "),
        Ident::new(&spec.id_column)?
    );
    // ?1 stays unused when only the flag column exists; binding NULL keeps
    // the parameter positions stable.
    let row = sqlx::query(&sql)
        .bind(status_value)
        .bind(record_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CascadeError::NotFound {
            entity: spec.table.clone(),
            record_id: record_id.to_string(),
        })?;

    info!(
        target: "asset_admin",
        event = "soft_delete",
        entity = %spec.table,
        record_id,
        columns = %columns.join(",")
    );

    Ok(DeactivationOutcome {
        deactivated: true,
        entity: spec.table.clone(),
        id: record_id.to_string(),
        columns,
        record: row_to_value(&row),
    })
}
