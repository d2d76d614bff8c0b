use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use super::{DependencyEdge, EdgeAction, GraphDefinition, Hop};
use crate::ident::is_valid_identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    InvalidIdentifier { entity: String, identifier: String },
    DuplicateEntity(String),
    UnregisteredHop { entity: String, edge: String, table: String },
    DuplicateEdge { entity: String, edge: String },
    MissingPrefix { entity: String, edge: String },
    PrefixNotDelete { entity: String, edge: String },
    PrefixDeclaredEarlier { entity: String, edge: String },
    RoutesThroughDeleted { entity: String, edge: String, table: String },
    RoutesThroughNullified { entity: String, edge: String, column: String },
    Cycle { tables: Vec<String> },
    MissingEdge { entity: String, edge: String },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::InvalidIdentifier { entity, identifier } => {
                write!(f, "{entity}: invalid identifier {identifier:?}")
            }
            GraphIssue::DuplicateEntity(entity) => write!(f, "{entity}: declared twice"),
            GraphIssue::UnregisteredHop { entity, edge, table } => {
                write!(f, "{entity}: {edge} hops through unregistered table {table}")
            }
            GraphIssue::DuplicateEdge { entity, edge } => {
                write!(f, "{entity}: {edge} declared twice")
            }
            GraphIssue::MissingPrefix { entity, edge } => {
                write!(f, "{entity}: nothing deletes the first hop of {edge}")
            }
            GraphIssue::PrefixNotDelete { entity, edge } => {
                write!(f, "{entity}: first hop of {edge} is nullified, not deleted")
            }
            GraphIssue::PrefixDeclaredEarlier { entity, edge } => {
                write!(f, "{entity}: first hop of {edge} is deleted before {edge} runs")
            }
            GraphIssue::RoutesThroughDeleted { entity, edge, table } => {
                write!(f, "{entity}: {edge} routes through {table} after it was deleted")
            }
            GraphIssue::RoutesThroughNullified { entity, edge, column } => {
                write!(f, "{entity}: {edge} joins on {column} after it was nullified")
            }
            GraphIssue::Cycle { tables } => write!(f, "reference cycle: {}", tables.join(" -> ")),
            GraphIssue::MissingEdge { entity, edge } => {
                write!(f, "{entity}: missing edge {edge}")
            }
        }
    }
}

fn format_issues(issues: &[GraphIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("dependency graph rejected: {}", format_issues(.0))]
    Invalid(Vec<GraphIssue>),
    #[error("failed to parse graph definition: {0}")]
    Parse(String),
    #[error("failed to read graph file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    pub fn issues(&self) -> &[GraphIssue] {
        match self {
            GraphError::Invalid(issues) => issues,
            _ => &[],
        }
    }
}

/// `table.column` references `target`'s identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Reference {
    table: String,
    column: String,
    target: String,
}

type EdgeKey = (String, String, Vec<Hop>);

fn key_of(edge: &DependencyEdge) -> EdgeKey {
    (
        edge.dependent_table.clone(),
        edge.dependent_column.clone(),
        edge.via.clone(),
    )
}

fn describe_key(key: &EdgeKey) -> String {
    let (table, column, via) = key;
    let mut label = format!("{table}.{column}");
    for hop in via {
        label.push_str(&format!(" -> {}.{}", hop.table, hop.column));
    }
    label
}

/// Every reference implied by the graph: each edge contributes one per hop.
fn collect_references(def: &GraphDefinition) -> BTreeSet<Reference> {
    let mut refs = BTreeSet::new();
    for spec in &def.entities {
        for edge in &spec.edges {
            let mut chain: Vec<(&str, &str)> =
                vec![(edge.dependent_table.as_str(), edge.dependent_column.as_str())];
            chain.extend(edge.via.iter().map(|h| (h.table.as_str(), h.column.as_str())));
            for (idx, (table, column)) in chain.iter().enumerate() {
                let target = chain
                    .get(idx + 1)
                    .map(|(next, _)| *next)
                    .unwrap_or(spec.table.as_str());
                refs.insert(Reference {
                    table: table.to_string(),
                    column: column.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    refs
}

/// Validate a graph definition. All issues are collected before failing.
pub fn validate(def: &GraphDefinition) -> Result<(), GraphError> {
    let mut issues = Vec::new();

    check_identifiers(def, &mut issues);

    let mut seen = HashSet::new();
    for spec in &def.entities {
        if !seen.insert(spec.table.as_str()) {
            issues.push(GraphIssue::DuplicateEntity(spec.table.clone()));
        }
    }

    for spec in &def.entities {
        check_hops_registered(&spec.table, &spec.edges, &seen, &mut issues);
        check_order(&spec.table, &spec.edges, &mut issues);
    }

    let refs = collect_references(def);
    let cycles = find_cycles(&refs);
    let acyclic = cycles.is_empty();
    issues.extend(cycles);
    // The closure walk below only terminates on an acyclic relation.
    if acyclic {
        check_completeness(def, &refs, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(GraphError::Invalid(issues))
    }
}

fn check_identifiers(def: &GraphDefinition, issues: &mut Vec<GraphIssue>) {
    for spec in &def.entities {
        let mut idents: Vec<&str> = vec![spec.table.as_str(), spec.id_column.as_str()];
        if let Some(soft) = &spec.soft_status {
            idents.extend(soft.status_column.as_deref());
            idents.extend(soft.active_flag_column.as_deref());
        }
        for edge in &spec.edges {
            idents.push(&edge.dependent_table);
            idents.push(&edge.dependent_column);
            for hop in &edge.via {
                idents.push(&hop.table);
                idents.push(&hop.column);
            }
        }
        for ident in idents {
            if !is_valid_identifier(ident) {
                issues.push(GraphIssue::InvalidIdentifier {
                    entity: spec.table.clone(),
                    identifier: ident.to_string(),
                });
            }
        }
    }
}

fn check_hops_registered(
    entity: &str,
    edges: &[DependencyEdge],
    registered: &HashSet<&str>,
    issues: &mut Vec<GraphIssue>,
) {
    for edge in edges {
        for hop in &edge.via {
            if !registered.contains(hop.table.as_str()) {
                issues.push(GraphIssue::UnregisteredHop {
                    entity: entity.to_string(),
                    edge: edge.describe(),
                    table: hop.table.clone(),
                });
            }
        }
    }
}

/// Leaf-first ordering within one entity's edge list.
fn check_order(entity: &str, edges: &[DependencyEdge], issues: &mut Vec<GraphIssue>) {
    let mut positions: HashMap<EdgeKey, usize> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        if positions.insert(key_of(edge), idx).is_some() {
            issues.push(GraphIssue::DuplicateEdge {
                entity: entity.to_string(),
                edge: edge.describe(),
            });
        }
    }

    for (idx, edge) in edges.iter().enumerate() {
        if let Some((first, rest)) = edge.via.split_first() {
            let prefix: EdgeKey = (first.table.clone(), first.column.clone(), rest.to_vec());
            match positions.get(&prefix) {
                None => issues.push(GraphIssue::MissingPrefix {
                    entity: entity.to_string(),
                    edge: edge.describe(),
                }),
                Some(&pos) => {
                    if edges[pos].action != EdgeAction::Delete {
                        issues.push(GraphIssue::PrefixNotDelete {
                            entity: entity.to_string(),
                            edge: edge.describe(),
                        });
                    }
                    if pos < idx {
                        issues.push(GraphIssue::PrefixDeclaredEarlier {
                            entity: entity.to_string(),
                            edge: edge.describe(),
                        });
                    }
                }
            }
        }

        for earlier in &edges[..idx] {
            for hop in &edge.via {
                match earlier.action {
                    EdgeAction::Delete if earlier.dependent_table == hop.table => {
                        issues.push(GraphIssue::RoutesThroughDeleted {
                            entity: entity.to_string(),
                            edge: edge.describe(),
                            table: hop.table.clone(),
                        });
                    }
                    EdgeAction::Nullify
                        if earlier.dependent_table == hop.table
                            && earlier.dependent_column == hop.column =>
                    {
                        issues.push(GraphIssue::RoutesThroughNullified {
                            entity: entity.to_string(),
                            edge: edge.describe(),
                            column: format!("{}.{}", hop.table, hop.column),
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}

fn find_cycles(refs: &BTreeSet<Reference>) -> Vec<GraphIssue> {
    let mut issues = Vec::new();
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for reference in refs {
        if reference.table == reference.target {
            issues.push(GraphIssue::Cycle {
                tables: vec![reference.table.clone(), reference.target.clone()],
            });
            continue;
        }
        for name in [reference.table.as_str(), reference.target.as_str()] {
            if !nodes.contains_key(name) {
                let idx = graph.add_node(name);
                nodes.insert(name, idx);
            }
        }
        graph.update_edge(
            nodes[reference.table.as_str()],
            nodes[reference.target.as_str()],
            (),
        );
    }

    for component in tarjan_scc(&graph) {
        if component.len() > 1 {
            let mut tables: Vec<String> =
                component.iter().map(|idx| graph[*idx].to_string()).collect();
            tables.sort();
            issues.push(GraphIssue::Cycle { tables });
        }
    }
    issues
}

/// Every reference into an entity, and transitively into every table an
/// edge deletes, must be declared with the full path back to the root.
fn check_completeness(
    def: &GraphDefinition,
    refs: &BTreeSet<Reference>,
    issues: &mut Vec<GraphIssue>,
) {
    for spec in &def.entities {
        let declared: HashMap<EdgeKey, &DependencyEdge> =
            spec.edges.iter().map(|edge| (key_of(edge), edge)).collect();

        let mut pending: Vec<EdgeKey> = refs
            .iter()
            .filter(|r| r.target == spec.table)
            .map(|r| (r.table.clone(), r.column.clone(), Vec::new()))
            .collect();

        while let Some(key) = pending.pop() {
            match declared.get(&key) {
                None => issues.push(GraphIssue::MissingEdge {
                    entity: spec.table.clone(),
                    edge: describe_key(&key),
                }),
                Some(edge) if edge.action == EdgeAction::Delete => {
                    let (table, column, via) = key;
                    let mut next_via = vec![Hop::new(table.clone(), column)];
                    next_via.extend(via);
                    pending.extend(refs.iter().filter(|r| r.target == table).map(|r| {
                        (r.table.clone(), r.column.clone(), next_via.clone())
                    }));
                }
                Some(_) => {}
            }
        }
    }
}
