use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use anyhow::Error as AnyhowError;
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use std::io::Error as IoError;

use crate::cascade::CascadeError;
use crate::graph::GraphError;

/// A structured error that can be serialized and returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    /// Machine readable error code.
    pub code: String,
    pub message: String,
    /// Arbitrary key/value pairs that provide additional context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
    /// Optional nested cause that preserves the error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<AppError>>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Default code used when an upstream error does not expose a specific code.
    pub const UNKNOWN_CODE: &'static str = "APP/UNKNOWN";
    pub const GENERIC_CODE: &'static str = "APP/GENERIC";

    pub const UNKNOWN_ENTITY: &'static str = "CASCADE/UNKNOWN_ENTITY";
    pub const NOT_FOUND: &'static str = "CASCADE/NOT_FOUND";
    pub const BLOCKED: &'static str = "CASCADE/BLOCKED";
    pub const INCOMPLETE: &'static str = "CASCADE/INCOMPLETE";
    pub const SOFT_DELETE_UNSUPPORTED: &'static str = "CASCADE/SOFT_DELETE_UNSUPPORTED";
    pub const GRAPH_INVALID: &'static str = "GRAPH/INVALID";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    /// Adds a contextual key/value pair to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {} ({:?})", self.code, self.message, self.context)
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        AppError::new(AppError::GENERIC_CODE, message)
    }
}

impl From<AnyhowError> for AppError {
    fn from(error: AnyhowError) -> Self {
        fn convert(err: &(dyn StdError + 'static)) -> AppError {
            if let Some(app) = err.downcast_ref::<AppError>() {
                return app.clone();
            }

            let mut root = AppError::new(AppError::UNKNOWN_CODE, err.to_string());
            if let Some(source) = err.source() {
                root.cause = Some(Box::new(convert(source)));
            }
            root
        }

        convert(error.as_ref())
    }
}

impl From<IoError> for AppError {
    fn from(error: IoError) -> Self {
        let code = format!("IO/{:?}", error.kind());
        let mut app_error = AppError::new(code, error.to_string());
        if let Some(os_code) = error.raw_os_error() {
            app_error = app_error.with_context("os_code", os_code.to_string());
        }
        app_error
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::new("SQLX/ROW_NOT_FOUND", "Record not found"),
            SqlxError::PoolTimedOut => AppError::new(
                "SQLX/POOL_TIMEOUT",
                "Timed out acquiring a database connection",
            ),
            SqlxError::PoolClosed => AppError::new("SQLX/POOL_CLOSED", "Database pool is closed"),
            SqlxError::Io(err) => AppError::from(err).with_context("source", "sqlx"),
            SqlxError::Database(db) => {
                let code = db
                    .code()
                    .map(|code| format!("Sqlite/{code}"))
                    .unwrap_or_else(|| "SQLX/DATABASE".to_string());
                let mut app_error = AppError::new(code, db.message().to_string());
                if let Some(constraint) = db.constraint() {
                    app_error = app_error.with_context("constraint", constraint.to_string());
                }
                app_error
            }
            other => AppError::new("SQLX/ERROR", other.to_string()),
        }
    }
}

impl From<CascadeError> for AppError {
    fn from(error: CascadeError) -> Self {
        let message = error.to_string();
        match error {
            CascadeError::UnknownEntity(entity) => {
                AppError::new(AppError::UNKNOWN_ENTITY, message).with_context("entity", entity)
            }
            CascadeError::NotFound { entity, record_id } => AppError::new(AppError::NOT_FOUND, message)
                .with_context("entity", entity)
                .with_context("id", record_id),
            CascadeError::BlockedByDependents {
                entity,
                record_id,
                dependents,
                warnings,
            } => {
                let tables = dependents
                    .iter()
                    .map(|d| format!("{}={}", d.table, d.count))
                    .collect::<Vec<_>>()
                    .join(",");
                let app_error = AppError::new(AppError::BLOCKED, message)
                    .with_context("entity", entity)
                    .with_context("id", record_id)
                    .with_context("dependents", tables);
                if warnings.is_empty() {
                    app_error
                } else {
                    let skipped = warnings
                        .iter()
                        .map(|w| w.edge.clone())
                        .collect::<Vec<_>>()
                        .join(",");
                    app_error.with_context("skipped", skipped)
                }
            }
            CascadeError::CascadeIncomplete {
                table,
                column,
                detail,
            } => {
                let mut app_error = AppError::new(AppError::INCOMPLETE, message)
                    .with_context("table", table)
                    .with_context("detail", detail);
                if let Some(column) = column {
                    app_error = app_error.with_context("column", column);
                }
                app_error
            }
            CascadeError::SoftDeleteUnsupported { entity } => {
                AppError::new(AppError::SOFT_DELETE_UNSUPPORTED, message)
                    .with_context("entity", entity)
            }
            CascadeError::RootTableMissing(table) => {
                AppError::new("CASCADE/ROOT_TABLE_MISSING", message).with_context("table", table)
            }
            CascadeError::Identifier(err) => AppError::new("CASCADE/IDENTIFIER", err.to_string()),
            CascadeError::Database(err) => AppError::from(err),
        }
    }
}

impl From<GraphError> for AppError {
    fn from(error: GraphError) -> Self {
        let issues = error.issues().len();
        let app_error = AppError::new(AppError::GRAPH_INVALID, error.to_string());
        if issues > 0 {
            app_error.with_context("issues", issues.to_string())
        } else {
            app_error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::DependentCount;
    use crate::graph::EdgeAction;
    use anyhow::Context;

    #[test]
    fn builds_error_with_context() {
        let error = AppError::new("TEST/CODE", "Something went wrong")
            .with_context("entity", "buildings");

        assert_eq!(error.code(), "TEST/CODE");
        assert_eq!(error.context().get("entity"), Some(&"buildings".to_string()));
        assert!(error.cause.is_none());
        assert_eq!(AppError::from("inner failure").code(), AppError::GENERIC_CODE);
    }

    #[test]
    fn converts_anyhow_error_chain_into_nested_causes() {
        let err = (|| -> anyhow::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
                .context("failed to open database")
        })()
        .unwrap_err();

        let app_error = AppError::from(err);
        assert_eq!(app_error.code(), AppError::UNKNOWN_CODE);
        assert_eq!(app_error.message(), "failed to open database");
        let cause = app_error.cause.as_deref().expect("cause present");
        assert!(cause.message().contains("disk full"));
        assert!(std::error::Error::source(&app_error).is_some());
    }

    #[test]
    fn cascade_errors_map_to_stable_codes() {
        let blocked = AppError::from(CascadeError::BlockedByDependents {
            entity: "buildings".into(),
            record_id: "B1".into(),
            dependents: vec![DependentCount {
                table: "building_rooms".into(),
                column: "building_id".into(),
                count: 2,
                action: EdgeAction::Delete,
                auto_cascade: false,
                via: vec![],
            }],
            warnings: vec![],
        });
        assert_eq!(blocked.code(), AppError::BLOCKED);
        assert_eq!(
            blocked.context().get("dependents"),
            Some(&"building_rooms=2".to_string())
        );

        let incomplete = AppError::from(CascadeError::CascadeIncomplete {
            table: "assets".into(),
            column: Some("room_id".into()),
            detail: "FOREIGN KEY constraint failed".into(),
        });
        assert_eq!(incomplete.code(), AppError::INCOMPLETE);
        assert_eq!(incomplete.context().get("column"), Some(&"room_id".to_string()));

        let unknown = AppError::from(CascadeError::UnknownEntity("spaceships".into()));
        assert_eq!(unknown.code(), AppError::UNKNOWN_ENTITY);
    }

    #[test]
    fn sqlx_row_not_found_translates_to_specific_code() {
        let app_error = AppError::from(SqlxError::RowNotFound);
        assert_eq!(app_error.code(), "SQLX/ROW_NOT_FOUND");
    }

    #[test]
    fn json_shape_is_flat_struct() {
        let error = AppError::new("VALIDATION", "nope").with_context("field", "name");
        let value = serde_json::to_value(&error).expect("serialize app error");
        assert_eq!(value["code"], "VALIDATION");
        assert_eq!(value["context"]["field"], "name");
        assert!(value.get("cause").is_none());
    }
}
