use thiserror::Error;

use super::check::DependentCount;
use super::resolver::SkippedEdge;
use crate::ident::InvalidIdent;

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("{entity} record {record_id} not found")]
    NotFound { entity: String, record_id: String },
    #[error(
        "{entity} record {record_id} still has dependents in {} table(s)",
        .dependents.len()
    )]
    BlockedByDependents {
        entity: String,
        record_id: String,
        dependents: Vec<DependentCount>,
        /// Declared edges the live schema could not resolve.
        warnings: Vec<SkippedEdge>,
    },
    #[error("cascade incomplete: rows in {table} still reference the record ({detail})")]
    CascadeIncomplete {
        table: String,
        column: Option<String>,
        detail: String,
    },
    #[error("{entity} has no soft-status columns in the live schema")]
    SoftDeleteUnsupported { entity: String },
    #[error("table {0} does not exist")]
    RootTableMissing(String),
    #[error(transparent)]
    Identifier(#[from] InvalidIdent),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CascadeError {
    /// Taxonomy name surfaced to HTTP clients.
    pub fn kind(&self) -> &'static str {
        match self {
            CascadeError::UnknownEntity(_) => "UnknownEntity",
            CascadeError::NotFound { .. } => "NotFound",
            CascadeError::BlockedByDependents { .. } => "BlockedByDependents",
            CascadeError::CascadeIncomplete { .. } => "CascadeIncomplete",
            CascadeError::SoftDeleteUnsupported { .. } => "SoftDeleteUnsupported",
            CascadeError::RootTableMissing(_) => "RootTableMissing",
            CascadeError::Identifier(_) => "InvalidIdentifier",
            CascadeError::Database(_) => "Database",
        }
    }

    /// Map a failed statement. Foreign-key violations mean the graph missed a
    /// dependent of `table`; everything else is a plain database error.
    pub(crate) fn from_statement(err: sqlx::Error, table: &str, column: Option<&str>) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_foreign_key_violation() {
                return CascadeError::CascadeIncomplete {
                    table: table.to_string(),
                    column: column.map(str::to_string),
                    detail: db.message().to_string(),
                };
            }
        }
        CascadeError::Database(err)
    }
}
