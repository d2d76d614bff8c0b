//! The one place where dependency edges become SQL text.
//!
//! The blocking check and the executor both call [`Predicate::statement`], so
//! a count taken during a preview always describes exactly the rows a cascade
//! would touch. Every statement carries a single `?1` placeholder bound to the
//! root record id.

use crate::graph::EdgeAction;
use crate::ident::Ident;

/// A hop with its identifier column already looked up in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHop {
    pub table: Ident,
    pub column: Ident,
    pub id_column: Ident,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Count,
    Delete,
    Nullify,
}

impl From<EdgeAction> for StatementKind {
    fn from(action: EdgeAction) -> Self {
        match action {
            EdgeAction::Delete => StatementKind::Delete,
            EdgeAction::Nullify => StatementKind::Nullify,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    table: Ident,
    column: Ident,
    chain: Vec<ResolvedHop>,
}

impl Predicate {
    pub fn new(table: Ident, column: Ident, chain: Vec<ResolvedHop>) -> Self {
        Predicate {
            table,
            column,
            chain,
        }
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn column(&self) -> &Ident {
        &self.column
    }

    /// Body of the `WHERE` clause selecting the dependent rows.
    ///
    /// Hops nest from the root outwards:
    /// `"c" IN (SELECT "id" FROM "h1" WHERE "c1" IN (SELECT "id" FROM "h2" WHERE "c2" = ?1))`.
    pub fn where_clause(&self) -> String {
        let mut inner: Option<String> = None;
        for hop in self.chain.iter().rev() {
            let condition = match inner {
                None => format!("{} = ?1", hop.column),
                Some(sub) => format!("{} IN ({})", hop.column, sub),
            };
            inner = Some(format!(
                "SELECT {} FROM {} WHERE {}",
                hop.id_column, hop.table, condition
            ));
        }
        match inner {
            None => format!("{} = ?1", self.column),
            Some(sub) => format!("{} IN ({})", self.column, sub),
        }
    }

    pub fn statement(&self, kind: StatementKind) -> String {
        let filter = self.where_clause();
        match kind {
            StatementKind::Count => format!("SELECT COUNT(*) FROM {} WHERE {}", self.table, filter),
            StatementKind::Delete => format!("DELETE FROM {} WHERE {}", self.table, filter),
            StatementKind::Nullify => format!(
                "UPDATE {} SET {} = NULL WHERE {}",
                self.table, self.column, filter
            ),
        }
    }
}

/// Final statement of every cascade; returns the removed row.
pub fn root_delete_sql(table: &Ident, id_column: &Ident) -> String {
    format!("DELETE FROM {table} WHERE {id_column} = ?1 RETURNING *")
}

pub fn root_exists_sql(table: &Ident, id_column: &Ident) -> String {
    format!("SELECT 1 FROM {table} WHERE {id_column} = ?1")
}
