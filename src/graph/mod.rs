//! Declarative dependency graph for the cascading-deletion engine.
//!
//! Each entity lists, leaf-first, every edge that has to be resolved before a
//! row of that entity can be removed. A graph is only usable after it went
//! through [`DependencyGraph::from_definition`], which runs the validation in
//! [`validate`]; the resulting value is immutable and shared behind an `Arc`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod builtin;
pub mod validate;

pub use validate::{GraphError, GraphIssue};

/// Version of the graph compiled into the binary.
pub const GRAPH_VERSION: u32 = 3;

fn default_id_column() -> String {
    "id".to_string()
}

fn default_inactive_value() -> String {
    "inactive".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeAction {
    /// Remove the dependent rows.
    Delete,
    /// Set the dependent column to NULL and keep the row.
    Nullify,
}

impl EdgeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeAction::Delete => "delete",
            EdgeAction::Nullify => "nullify",
        }
    }
}

/// One intermediate table on the way from a dependent table to the root.
///
/// `column` on `table` references the identifier of the next hop, or of the
/// root entity for the last hop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    pub table: String,
    pub column: String,
}

impl Hop {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Hop {
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub dependent_table: String,
    pub dependent_column: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<Hop>,
    pub action: EdgeAction,
    /// The dependent table may not exist in every deployment.
    #[serde(default)]
    pub optional: bool,
    /// Dependents on this edge never block a non-cascade delete.
    #[serde(default)]
    pub auto_cascade: bool,
}

impl DependencyEdge {
    pub fn new(
        dependent_table: impl Into<String>,
        dependent_column: impl Into<String>,
        action: EdgeAction,
    ) -> Self {
        DependencyEdge {
            dependent_table: dependent_table.into(),
            dependent_column: dependent_column.into(),
            via: Vec::new(),
            action,
            optional: false,
            auto_cascade: false,
        }
    }

    pub fn via(mut self, hops: &[(&str, &str)]) -> Self {
        self.via = hops
            .iter()
            .map(|(table, column)| Hop::new(*table, *column))
            .collect();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn auto_cascade(mut self) -> Self {
        self.auto_cascade = true;
        self
    }

    pub fn is_direct(&self) -> bool {
        self.via.is_empty()
    }

    /// Tables touched by this edge, dependent first.
    pub fn path_tables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.dependent_table.as_str()).chain(self.via.iter().map(|h| h.table.as_str()))
    }

    /// Human readable `table.column <- hop.column <- ...` label used in logs.
    pub fn describe(&self) -> String {
        let mut label = format!("{}.{}", self.dependent_table, self.dependent_column);
        for hop in &self.via {
            label.push_str(&format!(" -> {}.{}", hop.table, hop.column));
        }
        label
    }
}

/// Shorthand used by graph definitions.
pub fn delete(table: &str, column: &str) -> DependencyEdge {
    DependencyEdge::new(table, column, EdgeAction::Delete)
}

/// Shorthand used by graph definitions.
pub fn nullify(table: &str, column: &str) -> DependencyEdge {
    DependencyEdge::new(table, column, EdgeAction::Nullify)
}

/// Columns used to deactivate a row when a hard delete is not wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_column: Option<String>,
    #[serde(default = "default_inactive_value")]
    pub inactive_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_flag_column: Option<String>,
}

impl SoftStatus {
    pub fn status_and_flag() -> Self {
        SoftStatus {
            status_column: Some("status".into()),
            inactive_value: default_inactive_value(),
            active_flag_column: Some("is_active".into()),
        }
    }

    pub fn status_only() -> Self {
        SoftStatus {
            active_flag_column: None,
            ..Self::status_and_flag()
        }
    }

    pub fn flag_only() -> Self {
        SoftStatus {
            status_column: None,
            ..Self::status_and_flag()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub table: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_status: Option<SoftStatus>,
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,
}

impl EntitySpec {
    pub fn edge(mut self, edge: DependencyEdge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn soft_status(mut self, status: SoftStatus) -> Self {
        self.soft_status = Some(status);
        self
    }

    pub fn id_column(mut self, column: &str) -> Self {
        self.id_column = column.to_string();
        self
    }
}

pub fn entity(table: &str) -> EntitySpec {
    EntitySpec {
        table: table.to_string(),
        id_column: default_id_column(),
        soft_status: None,
        edges: Vec::new(),
    }
}

/// Unvalidated graph as authored in code or read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub version: u32,
    pub entities: Vec<EntitySpec>,
}

/// A validated, immutable dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    version: u32,
    entities: BTreeMap<String, EntitySpec>,
}

impl DependencyGraph {
    /// Validate a definition and freeze it.
    pub fn from_definition(definition: GraphDefinition) -> Result<Self, GraphError> {
        validate::validate(&definition)?;
        let entities = definition
            .entities
            .into_iter()
            .map(|spec| (spec.table.clone(), spec))
            .collect();
        Ok(DependencyGraph {
            version: definition.version,
            entities,
        })
    }

    /// The graph for the schema shipped in `migrations/`.
    pub fn builtin() -> Result<Self, GraphError> {
        Self::from_definition(builtin::definition())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, GraphError> {
        let definition: GraphDefinition =
            serde_json::from_str(raw).map_err(|err| GraphError::Parse(err.to_string()))?;
        Self::from_definition(definition)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, GraphError> {
        let raw = std::fs::read_to_string(path).map_err(|err| GraphError::Read {
            path: path.display().to_string(),
            source: err,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entity(&self, table: &str) -> Option<&EntitySpec> {
        self.entities.get(table)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySpec> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Identifier column of a registered table; `id` when unknown.
    pub fn id_column_of(&self, table: &str) -> &str {
        self.entities
            .get(table)
            .map(|spec| spec.id_column.as_str())
            .unwrap_or("id")
    }

    pub fn to_definition(&self) -> GraphDefinition {
        GraphDefinition {
            version: self.version,
            entities: self.entities.values().cloned().collect(),
        }
    }
}
