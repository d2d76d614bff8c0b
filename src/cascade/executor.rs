//! Applies a cascade plan inside a single transaction.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, warn};

use super::predicate::{root_delete_sql, StatementKind};
use super::report::{DeletionSummary, StepOutcome};
use super::resolver::CascadePlan;
use super::CascadeError;
use crate::id::new_uuid_v7;
use crate::ident::Ident;
use crate::rows::row_to_value;
use crate::time::now_ms;

/// Run every step of `plan` in order, then delete the root row.
///
/// Nothing is committed unless the root row was removed. The plan is expected
/// to be resolved against a catalog read before this call.
pub async fn execute(pool: &SqlitePool, plan: &CascadePlan) -> Result<DeletionSummary, CascadeError> {
    let operation_id = new_uuid_v7();
    let mut tx = pool.begin().await?;
    info!(
        target: "asset_admin",
        event = "db_tx_begin",
        operation_id = %operation_id,
        entity = %plan.entity,
        record_id = %plan.record_id,
        steps = plan.steps.len()
    );

    match run_steps(&mut *tx, plan, &operation_id).await {
        Ok((steps, deleted_record)) => {
            tx.commit().await?;
            info!(
                target: "asset_admin",
                event = "db_tx_commit",
                operation_id = %operation_id,
                entity = %plan.entity,
                record_id = %plan.record_id
            );
            Ok(DeletionSummary {
                operation_id,
                entity: plan.entity.clone(),
                record_id: plan.record_id.clone(),
                graph_version: plan.graph_version,
                steps,
                deleted_record,
                warnings: plan.warnings(),
                completed_at_ms: now_ms(),
            })
        }
        Err(err) => {
            if let Err(rb) = tx.rollback().await {
                error!(
                    target: "asset_admin",
                    event = "db_tx_rollback_failed",
                    operation_id = %operation_id,
                    error = %rb
                );
            } else {
                warn!(
                    target: "asset_admin",
                    event = "db_tx_rollback",
                    operation_id = %operation_id,
                    entity = %plan.entity,
                    record_id = %plan.record_id,
                    error = %err
                );
            }
            Err(err)
        }
    }
}

async fn run_steps(
    conn: &mut SqliteConnection,
    plan: &CascadePlan,
    operation_id: &str,
) -> Result<(Vec<StepOutcome>, serde_json::Value), CascadeError> {
    let mut outcomes = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let sql = step.predicate.statement(StatementKind::from(step.action));
        let rows = sqlx::query(&sql)
            .bind(&plan.record_id)
            .execute(&mut *conn)
            .await
            .map_err(|err| CascadeError::from_statement(err, &step.table, Some(&step.column)))?
            .rows_affected();
        info!(
            target: "asset_admin",
            event = "cascade_step",
            operation_id,
            table = %step.table,
            column = %step.column,
            action = step.action.as_str(),
            rows
        );
        outcomes.push(StepOutcome {
            table: step.table.clone(),
            column: step.column.clone(),
            action: step.action,
            rows,
            via: step.via.clone(),
        });
    }

    let root = match sqlx::query(&root_delete_sql(&plan.root_table, &plan.root_id_column))
        .bind(&plan.record_id)
        .fetch_optional(&mut *conn)
        .await
    {
        Ok(row) => row,
        Err(err) => {
            let mut mapped = CascadeError::from_statement(err, plan.root_table.as_str(), None);
            if let CascadeError::CascadeIncomplete { table, column, .. } = &mut mapped {
                if let Ok(Some((dependent, fk_column))) = remaining_reference(conn, plan).await {
                    *table = dependent;
                    *column = Some(fk_column);
                }
            }
            return Err(mapped);
        }
    };

    match root {
        Some(row) => Ok((outcomes, row_to_value(&row))),
        None => Err(CascadeError::NotFound {
            entity: plan.entity.clone(),
            record_id: plan.record_id.clone(),
        }),
    }
}

/// First table that still holds a foreign key to the root record.
///
/// SQLite reports a failed foreign key without naming the table, so the
/// schema is asked for every reference to the root table and each one is
/// probed for rows. The failed statement leaves the transaction usable.
async fn remaining_reference(
    conn: &mut SqliteConnection,
    plan: &CascadePlan,
) -> Result<Option<(String, String)>, CascadeError> {
    let references: Vec<(String, String, Option<String>)> = sqlx::query_as(
        "SELECT m.name, f.\"from\", f.\"to\" \
         FROM sqlite_master m JOIN pragma_foreign_key_list(m.name) f \
         WHERE m.type = 'table' AND f.\"table\" = ?1 \
         ORDER BY m.name, f.id",
    )
    .bind(plan.root_table.as_str())
    .fetch_all(&mut *conn)
    .await?;

    for (table, column, target) in references {
        let target = match target {
            Some(target) => Ident::new(&target)?,
            None => plan.root_id_column.clone(),
        };
        let sql = format!(
            "SELECT 1 FROM {dependent} WHERE {fk} IN (SELECT {target} FROM {root} WHERE {id} = ?1) LIMIT 1",
            dependent = Ident::new(&table)?,
            fk = Ident::new(&column)?,
            root = plan.root_table,
            id = plan.root_id_column,
        );
        let hit: Option<i64> = sqlx::query_scalar(&sql)
            .bind(&plan.record_id)
            .fetch_optional(&mut *conn)
            .await?;
        if hit.is_some() {
            return Ok(Some((table, column)));
        }
    }
    Ok(None)
}
