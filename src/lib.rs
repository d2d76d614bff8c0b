//! Facilities admin backend built around a cascading-deletion engine.
//!
//! The dependency graph in [`graph`] declares, per entity, which rows must be
//! removed or unlinked before a record can go. [`cascade::DeletionService`]
//! turns that into checked, transactional deletes; [`http`] and the
//! `asset-admin` binary expose it.

use std::path::Path;
use std::sync::Arc;

pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod http;
mod id;
pub mod ident;
pub mod logging;
pub mod migrate;
pub mod rows;
pub mod schema;
pub mod time;

pub use cascade::{
    CascadeError, CascadePlan, DeleteOptions, DeleteOutcome, DeletionReport, DeletionService,
    DeletionSummary,
};
pub use error::{AppError, AppResult};
pub use graph::{DependencyGraph, GraphError};

/// The graph from `path` when given, otherwise the built-in one.
pub fn load_graph(path: Option<&Path>) -> Result<Arc<DependencyGraph>, GraphError> {
    let graph = match path {
        Some(path) => DependencyGraph::from_json_file(path)?,
        None => DependencyGraph::builtin()?,
    };
    tracing::info!(
        target: "asset_admin",
        event = "graph_loaded",
        version = graph.version(),
        entities = graph.len(),
        source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "builtin".into())
    );
    Ok(Arc::new(graph))
}
