//! Caller-facing shapes of cascade results.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::check::DependentCount;
use super::resolver::SkippedEdge;
use crate::graph::{EdgeAction, Hop};

/// Rows touched by one executed plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub table: String,
    pub column: String,
    pub action: EdgeAction,
    pub rows: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<Hop>,
}

/// What a committed cascade did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub operation_id: String,
    pub entity: String,
    pub record_id: String,
    pub graph_version: u32,
    pub steps: Vec<StepOutcome>,
    pub deleted_record: Value,
    pub warnings: Vec<SkippedEdge>,
    pub completed_at_ms: i64,
}

impl DeletionSummary {
    fn totals(&self, action: EdgeAction) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for step in self.steps.iter().filter(|s| s.action == action && s.rows > 0) {
            *totals.entry(step.table.clone()).or_insert(0) += step.rows;
        }
        totals
    }

    /// Deleted rows per dependent table.
    pub fn deleted(&self) -> BTreeMap<String, u64> {
        self.totals(EdgeAction::Delete)
    }

    /// Nullified rows per dependent table.
    pub fn nullified(&self) -> BTreeMap<String, u64> {
        self.totals(EdgeAction::Nullify)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub entity: String,
    pub id: String,
    /// Dependents touched, deleted and nullified combined. The root is not
    /// included.
    pub summary: BTreeMap<String, u64>,
    pub deleted: BTreeMap<String, u64>,
    pub nullified: BTreeMap<String, u64>,
    /// Includes the root record.
    pub total_deleted: u64,
    pub total_nullified: u64,
    pub deleted_record: Value,
    pub warnings: Vec<SkippedEdge>,
    pub graph_version: u32,
    pub operation_id: String,
}

impl From<&DeletionSummary> for DeletionReport {
    fn from(summary: &DeletionSummary) -> Self {
        let deleted = summary.deleted();
        let nullified = summary.nullified();
        let mut combined = deleted.clone();
        for (table, rows) in &nullified {
            *combined.entry(table.clone()).or_insert(0) += rows;
        }
        DeletionReport {
            entity: summary.entity.clone(),
            id: summary.record_id.clone(),
            total_deleted: deleted.values().sum::<u64>() + 1,
            total_nullified: nullified.values().sum(),
            summary: combined,
            deleted,
            nullified,
            deleted_record: summary.deleted_record.clone(),
            warnings: summary.warnings.clone(),
            graph_version: summary.graph_version,
            operation_id: summary.operation_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDependent {
    pub table: String,
    pub column: String,
    pub count: u64,
    pub action: EdgeAction,
}

/// Body of a refused non-cascade delete.
///
/// `dependents` run root-outward: direct dependents of the record first, the
/// furthest hops last. This is the reverse of plan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedReport {
    pub blocked: bool,
    pub entity: String,
    pub id: String,
    pub dependents: Vec<BlockedDependent>,
    /// Declared edges left out of the counts because the live schema lacks
    /// their table or column.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SkippedEdge>,
    pub message: String,
}

impl BlockedReport {
    pub fn new(
        entity: &str,
        id: &str,
        dependents: &[DependentCount],
        warnings: &[SkippedEdge],
    ) -> Self {
        let total: u64 = dependents.iter().map(|d| d.count).sum();
        let dependents: Vec<BlockedDependent> = dependents
            .iter()
            .rev()
            .map(|d| BlockedDependent {
                table: d.table.clone(),
                column: d.column.clone(),
                count: d.count,
                action: d.action,
            })
            .collect();
        let tables = dependents
            .iter()
            .map(|d| d.table.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut message = format!(
            "{entity} {id} is referenced by {total} row(s) in {tables}; retry with cascade=true to remove them"
        );
        if !warnings.is_empty() {
            message.push_str(&format!(
                "; {} declared dependency edge(s) could not be checked against the live schema",
                warnings.len()
            ));
        }
        BlockedReport {
            blocked: true,
            entity: entity.to_string(),
            id: id.to_string(),
            dependents,
            warnings: warnings.to_vec(),
            message,
        }
    }
}

/// Result of a dry run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub entity: String,
    pub id: String,
    pub graph_version: u32,
    /// Whether a non-cascade delete would be refused.
    pub blocked: bool,
    pub dependents: Vec<DependentCount>,
    pub skipped: Vec<SkippedEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivationOutcome {
    pub deactivated: bool,
    pub entity: String,
    pub id: String,
    pub columns: Vec<String>,
    pub record: Value,
}
