//! Read-only evaluation of a cascade plan.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use super::predicate::{root_exists_sql, StatementKind};
use super::resolver::CascadePlan;
use super::CascadeError;
use crate::graph::{EdgeAction, Hop};

/// Rows of one dependent group that currently reference the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentCount {
    pub table: String,
    pub column: String,
    pub count: u64,
    pub action: EdgeAction,
    #[serde(default)]
    pub auto_cascade: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<Hop>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub record_exists: bool,
    /// Groups with at least one row, in plan order.
    pub dependents: Vec<DependentCount>,
}

impl CheckResult {
    /// Groups that stop a delete the caller did not mark as cascading.
    pub fn blocking(&self) -> Vec<DependentCount> {
        self.dependents
            .iter()
            .filter(|d| !d.auto_cascade)
            .cloned()
            .collect()
    }
}

/// Count every step of `plan` inside one read transaction.
///
/// Any failing count fails the whole check; partial results are never
/// returned.
pub async fn check_blocking(
    pool: &SqlitePool,
    plan: &CascadePlan,
) -> Result<CheckResult, CascadeError> {
    let mut tx = pool.begin().await?;

    let exists: Option<i64> =
        sqlx::query_scalar(&root_exists_sql(&plan.root_table, &plan.root_id_column))
            .bind(&plan.record_id)
            .fetch_optional(&mut *tx)
            .await?;

    let mut dependents = Vec::new();
    for step in &plan.steps {
        let sql = step.predicate.statement(StatementKind::Count);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(&plan.record_id)
            .fetch_one(&mut *tx)
            .await?;
        debug!(
            target: "asset_admin",
            event = "cascade_check",
            entity = %plan.entity,
            table = %step.table,
            column = %step.column,
            count
        );
        if count > 0 {
            dependents.push(DependentCount {
                table: step.table.clone(),
                column: step.column.clone(),
                count: count as u64,
                action: step.action,
                auto_cascade: step.auto_cascade,
                via: step.via.clone(),
            });
        }
    }

    tx.rollback().await?;

    Ok(CheckResult {
        record_exists: exists.is_some(),
        dependents,
    })
}
