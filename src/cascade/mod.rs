//! Cascading deletion: resolve, check, execute and report.
//!
//! [`DeletionService`] is the only entry point the HTTP layer and the CLI
//! use. It owns the control flow: a delete that was not marked as cascading
//! is checked first and refused while non-auto dependents exist; a cascading
//! delete runs the whole plan in one transaction.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, warn};

pub mod check;
mod error;
pub mod executor;
pub mod predicate;
pub mod report;
pub mod resolver;
pub mod soft;

pub use check::{CheckResult, DependentCount};
pub use error::CascadeError;
pub use report::{
    BlockedReport, DeactivationOutcome, DeletionReport, DeletionSummary, PreviewReport,
    StepOutcome,
};
pub use resolver::{CascadePlan, PlanStep, SkipReason, SkippedEdge};

use crate::graph::DependencyGraph;
use crate::schema::SchemaCatalog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove or unlink every dependent instead of refusing.
    pub cascade: bool,
    /// Deactivate the record when dependents block a plain delete.
    pub soft_fallback: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(DeletionSummary),
    Deactivated(DeactivationOutcome),
}

#[derive(Clone)]
pub struct DeletionService {
    pool: SqlitePool,
    graph: Arc<DependencyGraph>,
}

impl DeletionService {
    pub fn new(pool: SqlitePool, graph: Arc<DependencyGraph>) -> Self {
        DeletionService { pool, graph }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn catalog_for(&self, entity: &str) -> Result<SchemaCatalog, CascadeError> {
        let tables = resolver::tables_for(&self.graph, entity);
        Ok(SchemaCatalog::load(&self.pool, tables.iter().map(String::as_str)).await?)
    }

    /// Build the plan for deleting `record_id` against the live schema.
    pub async fn resolve(&self, entity: &str, record_id: &str) -> Result<CascadePlan, CascadeError> {
        if self.graph.entity(entity).is_none() {
            return Err(CascadeError::UnknownEntity(entity.to_string()));
        }
        let catalog = self.catalog_for(entity).await?;
        resolver::resolve(&self.graph, &catalog, entity, record_id)
    }

    /// Dependents that currently reference the record, in plan order.
    pub async fn check_blocking(
        &self,
        entity: &str,
        record_id: &str,
    ) -> Result<Vec<DependentCount>, CascadeError> {
        let plan = self.resolve(entity, record_id).await?;
        Ok(check::check_blocking(&self.pool, &plan).await?.dependents)
    }

    /// Dry run. Fails with `NotFound` when the record does not exist.
    pub async fn preview(&self, entity: &str, record_id: &str) -> Result<PreviewReport, CascadeError> {
        let plan = self.resolve(entity, record_id).await?;
        let result = check::check_blocking(&self.pool, &plan).await?;
        if !result.record_exists {
            return Err(CascadeError::NotFound {
                entity: entity.to_string(),
                record_id: record_id.to_string(),
            });
        }
        Ok(PreviewReport {
            entity: entity.to_string(),
            id: record_id.to_string(),
            graph_version: plan.graph_version,
            blocked: !result.blocking().is_empty(),
            dependents: result.dependents,
            skipped: plan.skipped,
        })
    }

    /// Run a resolved plan as-is.
    pub async fn execute(&self, plan: &CascadePlan) -> Result<DeletionSummary, CascadeError> {
        executor::execute(&self.pool, plan).await
    }

    pub async fn delete(
        &self,
        entity: &str,
        record_id: &str,
        options: DeleteOptions,
    ) -> Result<DeleteOutcome, CascadeError> {
        let plan = self.resolve(entity, record_id).await?;
        if options.cascade {
            return self.execute(&plan).await.map(DeleteOutcome::Deleted);
        }

        let blocking = check::check_blocking(&self.pool, &plan).await?.blocking();
        if !blocking.is_empty() {
            return self.refuse(&plan, blocking, options).await;
        }

        match self.execute(&plan.auto_only()).await {
            Ok(summary) => Ok(DeleteOutcome::Deleted(summary)),
            Err(err @ CascadeError::CascadeIncomplete { .. }) => {
                // Someone inserted a dependent between the check and the delete.
                let blocking = check::check_blocking(&self.pool, &plan).await?.blocking();
                if blocking.is_empty() {
                    Err(err)
                } else {
                    warn!(
                        target: "asset_admin",
                        event = "cascade_blocked_late",
                        entity,
                        record_id,
                        groups = blocking.len()
                    );
                    self.refuse(&plan, blocking, options).await
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn refuse(
        &self,
        plan: &CascadePlan,
        dependents: Vec<DependentCount>,
        options: DeleteOptions,
    ) -> Result<DeleteOutcome, CascadeError> {
        let (entity, record_id) = (plan.entity.as_str(), plan.record_id.as_str());
        if options.soft_fallback {
            match self.deactivate(entity, record_id).await {
                Ok(outcome) => {
                    info!(
                        target: "asset_admin",
                        event = "soft_delete_fallback",
                        entity,
                        record_id,
                        groups = dependents.len()
                    );
                    return Ok(DeleteOutcome::Deactivated(outcome));
                }
                // No usable soft-status column in the live schema.
                Err(CascadeError::SoftDeleteUnsupported { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Err(CascadeError::BlockedByDependents {
            entity: entity.to_string(),
            record_id: record_id.to_string(),
            dependents,
            warnings: plan.warnings(),
        })
    }

    /// Mark the record inactive through its soft-status columns.
    pub async fn deactivate(
        &self,
        entity: &str,
        record_id: &str,
    ) -> Result<DeactivationOutcome, CascadeError> {
        let spec = self
            .graph
            .entity(entity)
            .ok_or_else(|| CascadeError::UnknownEntity(entity.to_string()))?;
        let catalog = SchemaCatalog::load(&self.pool, [spec.table.as_str()]).await?;
        soft::deactivate(&self.pool, &catalog, spec, record_id).await
    }
}
