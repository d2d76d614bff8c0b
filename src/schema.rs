//! Snapshot of the live schema, used to detect drift between the declared
//! dependency graph and what the database actually contains.

use std::collections::{BTreeMap, BTreeSet};

use sqlx::SqlitePool;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaCatalog {
    /// Read table and column names for `wanted` tables from `sqlite_master`.
    ///
    /// Tables that do not exist are simply absent from the catalog.
    pub async fn load<'a, I>(pool: &SqlitePool, wanted: I) -> Result<Self, sqlx::Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: BTreeSet<&str> = wanted.into_iter().collect();
        let mut conn = pool.acquire().await?;

        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut tables = BTreeMap::new();
        for table in existing {
            if !wanted.contains(table.as_str()) {
                continue;
            }
            let columns: Vec<String> =
                sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
                    .bind(&table)
                    .fetch_all(&mut *conn)
                    .await?;
            tables.insert(table, columns.into_iter().collect());
        }

        Ok(SchemaCatalog { tables })
    }

    /// Build a catalog by hand. Used by tests of the resolver.
    pub fn from_tables<'a, I, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, C)>,
        C: IntoIterator<Item = &'a str>,
    {
        let tables = entries
            .into_iter()
            .map(|(table, columns)| {
                (
                    table.to_string(),
                    columns.into_iter().map(str::to_string).collect(),
                )
            })
            .collect();
        SchemaCatalog { tables }
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|columns| columns.contains(column))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hand_built_catalog_answers_lookups() {
        let catalog = SchemaCatalog::from_tables([
            ("assets", vec!["id", "room_id"]),
            ("building_rooms", vec!["id", "building_id"]),
        ]);
        assert!(catalog.has_table("assets"));
        assert!(!catalog.has_table("pou_points"));
        assert!(catalog.has_column("assets", "room_id"));
        assert!(!catalog.has_column("assets", "building_id"));
        assert!(!catalog.has_column("pou_points", "asset_id"));
    }
}
