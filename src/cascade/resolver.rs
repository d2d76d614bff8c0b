//! Turn the declared edges of an entity into an ordered cascade plan.
//!
//! Resolution is pure: it only consults the graph and a [`SchemaCatalog`]
//! snapshot, so the same inputs always produce the same plan.

use serde::Serialize;
use tracing::{debug, warn};

use super::predicate::{Predicate, ResolvedHop};
use super::CascadeError;
use crate::graph::{DependencyEdge, DependencyGraph, EdgeAction, Hop};
use crate::ident::Ident;
use crate::schema::SchemaCatalog;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub table: String,
    pub column: String,
    pub action: EdgeAction,
    pub auto_cascade: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub via: Vec<Hop>,
    #[serde(skip)]
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// An optional dependent table is not deployed here.
    OptionalTableAbsent,
    MissingTable { missing: String },
    MissingColumn {
        missing: String,
        #[serde(rename = "missing_column")]
        column: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEdge {
    pub table: String,
    pub column: String,
    pub edge: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl SkippedEdge {
    /// Whether this skip means the live schema diverged from the graph.
    pub fn is_drift(&self) -> bool {
        !matches!(self.reason, SkipReason::OptionalTableAbsent)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadePlan {
    pub entity: String,
    pub record_id: String,
    pub graph_version: u32,
    pub steps: Vec<PlanStep>,
    pub skipped: Vec<SkippedEdge>,
    #[serde(skip)]
    pub root_table: Ident,
    #[serde(skip)]
    pub root_id_column: Ident,
}

impl CascadePlan {
    pub fn warnings(&self) -> Vec<SkippedEdge> {
        self.skipped.iter().filter(|s| s.is_drift()).cloned().collect()
    }

    /// Plan used for a delete the caller did not mark as cascading.
    pub fn auto_only(&self) -> CascadePlan {
        CascadePlan {
            steps: self
                .steps
                .iter()
                .filter(|step| step.auto_cascade)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Every table whose shape matters for planning deletes of `entity`.
pub fn tables_for(graph: &DependencyGraph, entity: &str) -> Vec<String> {
    let mut tables = vec![entity.to_string()];
    if let Some(spec) = graph.entity(entity) {
        for edge in &spec.edges {
            for table in edge.path_tables() {
                if !tables.iter().any(|t| t == table) {
                    tables.push(table.to_string());
                }
            }
        }
    }
    tables
}

pub fn resolve(
    graph: &DependencyGraph,
    catalog: &SchemaCatalog,
    entity: &str,
    record_id: &str,
) -> Result<CascadePlan, CascadeError> {
    let spec = graph
        .entity(entity)
        .ok_or_else(|| CascadeError::UnknownEntity(entity.to_string()))?;
    if !catalog.has_table(&spec.table) {
        return Err(CascadeError::RootTableMissing(spec.table.clone()));
    }

    let mut steps = Vec::new();
    let mut skipped = Vec::new();

    for edge in &spec.edges {
        if let Some(reason) = drift(graph, catalog, edge) {
            let skip = SkippedEdge {
                table: edge.dependent_table.clone(),
                column: edge.dependent_column.clone(),
                edge: edge.describe(),
                reason,
            };
            if skip.is_drift() {
                warn!(
                    target: "asset_admin",
                    event = "schema_drift",
                    entity,
                    edge = %skip.edge,
                    reason = ?skip.reason
                );
            } else {
                debug!(
                    target: "asset_admin",
                    event = "optional_table_absent",
                    entity,
                    table = %skip.table
                );
            }
            skipped.push(skip);
            continue;
        }

        let chain = edge
            .via
            .iter()
            .map(|hop| {
                Ok(ResolvedHop {
                    table: Ident::new(&hop.table)?,
                    column: Ident::new(&hop.column)?,
                    id_column: Ident::new(graph.id_column_of(&hop.table))?,
                })
            })
            .collect::<Result<Vec<_>, CascadeError>>()?;

        steps.push(PlanStep {
            table: edge.dependent_table.clone(),
            column: edge.dependent_column.clone(),
            action: edge.action,
            auto_cascade: edge.auto_cascade,
            via: edge.via.clone(),
            predicate: Predicate::new(
                Ident::new(&edge.dependent_table)?,
                Ident::new(&edge.dependent_column)?,
                chain,
            ),
        });
    }

    Ok(CascadePlan {
        entity: entity.to_string(),
        record_id: record_id.to_string(),
        graph_version: graph.version(),
        steps,
        skipped,
        root_table: Ident::new(&spec.table)?,
        root_id_column: Ident::new(&spec.id_column)?,
    })
}

fn drift(
    graph: &DependencyGraph,
    catalog: &SchemaCatalog,
    edge: &DependencyEdge,
) -> Option<SkipReason> {
    if edge.optional && !catalog.has_table(&edge.dependent_table) {
        return Some(SkipReason::OptionalTableAbsent);
    }
    if let Some(missing) = edge.path_tables().find(|t| !catalog.has_table(t)) {
        return Some(SkipReason::MissingTable {
            missing: missing.to_string(),
        });
    }

    let mut columns = vec![(edge.dependent_table.as_str(), edge.dependent_column.as_str())];
    for hop in &edge.via {
        columns.push((hop.table.as_str(), graph.id_column_of(&hop.table)));
        columns.push((hop.table.as_str(), hop.column.as_str()));
    }
    columns
        .into_iter()
        .find(|(table, column)| !catalog.has_column(table, column))
        .map(|(table, column)| SkipReason::MissingColumn {
            missing: table.to_string(),
            column: column.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{delete, entity, nullify, GraphDefinition};

    fn graph() -> DependencyGraph {
        DependencyGraph::from_definition(GraphDefinition {
            version: 9,
            entities: vec![
                entity("buildings")
                    .edge(
                        delete("pou_points", "asset_id")
                            .via(&[("assets", "room_id"), ("building_rooms", "building_id")]),
                    )
                    .edge(delete("assets", "room_id").via(&[("building_rooms", "building_id")]))
                    .edge(delete("building_rooms", "building_id"))
                    .edge(nullify("building_notes", "building_id").optional()),
                entity("building_rooms")
                    .edge(delete("pou_points", "asset_id").via(&[("assets", "room_id")]))
                    .edge(delete("assets", "room_id")),
                entity("assets").edge(delete("pou_points", "asset_id")),
                entity("pou_points"),
                entity("building_notes"),
            ],
        })
        .expect("valid test graph")
    }

    fn full_catalog() -> SchemaCatalog {
        SchemaCatalog::from_tables([
            ("buildings", vec!["id"]),
            ("building_rooms", vec!["id", "building_id"]),
            ("assets", vec!["id", "room_id"]),
            ("pou_points", vec!["id", "asset_id"]),
            ("building_notes", vec!["id", "building_id"]),
        ])
    }

    #[test]
    fn steps_follow_declared_order() {
        let plan = resolve(&graph(), &full_catalog(), "buildings", "B1").unwrap();
        let tables: Vec<_> = plan.steps.iter().map(|s| s.table.as_str()).collect();
        assert_eq!(
            tables,
            vec!["pou_points", "assets", "building_rooms", "building_notes"]
        );
        assert_eq!(plan.graph_version, 9);
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn unknown_entity_is_rejected() {
        let err = resolve(&graph(), &full_catalog(), "spaceships", "1").unwrap_err();
        assert!(matches!(err, CascadeError::UnknownEntity(name) if name == "spaceships"));
    }

    #[test]
    fn absent_optional_table_is_skipped_quietly() {
        let catalog = SchemaCatalog::from_tables([
            ("buildings", vec!["id"]),
            ("building_rooms", vec!["id", "building_id"]),
            ("assets", vec!["id", "room_id"]),
            ("pou_points", vec!["id", "asset_id"]),
        ]);
        let plan = resolve(&graph(), &catalog, "buildings", "B1").unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, SkipReason::OptionalTableAbsent);
        assert!(plan.warnings().is_empty());
    }

    #[test]
    fn missing_join_column_is_reported_as_drift() {
        let catalog = SchemaCatalog::from_tables([
            ("buildings", vec!["id"]),
            ("building_rooms", vec!["id", "building_id"]),
            ("assets", vec!["id", "space_id"]),
            ("pou_points", vec!["id", "asset_id"]),
            ("building_notes", vec!["id", "building_id"]),
        ]);
        let plan = resolve(&graph(), &catalog, "buildings", "B1").unwrap();
        let warnings = plan.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.reason
            == SkipReason::MissingColumn {
                missing: "assets".into(),
                column: "room_id".into()
            }));
        assert_eq!(plan.steps.len(), 2);
    }

    #[test]
    fn auto_only_keeps_auto_steps() {
        let plan = resolve(&graph(), &full_catalog(), "buildings", "B1").unwrap();
        assert!(plan.auto_only().steps.is_empty());
        assert_eq!(plan.auto_only().record_id, "B1");
    }

    #[test]
    fn tables_for_lists_every_path_table_once() {
        assert_eq!(
            tables_for(&graph(), "buildings"),
            vec!["buildings", "pou_points", "assets", "building_rooms", "building_notes"]
        );
    }
}
