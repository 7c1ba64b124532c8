use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::schema::{self, TableDef};

pub fn run(conn: &Connection) -> Result<()> {
    for table in schema::TABLES {
        conn.execute_batch(&ddl_for(table))?;
    }

    info!("Database migrations complete");
    Ok(())
}

/// Derive the DDL for one table from its schema declaration: the document
/// table itself, one expression index per declared index, and an FTS5 shadow
/// table for the search index if the table has one.
fn ddl_for(table: &TableDef) -> String {
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {t} (
            id          TEXT PRIMARY KEY,
            created_at  INTEGER NOT NULL,
            data        TEXT NOT NULL
        );\n",
        t = table.name,
    );

    for index in table.indexes {
        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{t}_{n}
                ON {t} (json_extract(data, '$.{f}'), created_at);\n",
            t = table.name,
            n = index.name,
            f = index.field,
        ));
    }

    if let Some(search) = table.search_index {
        ddl.push_str(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {st} USING fts5({f});\n",
            st = table.search_table(search),
            f = search.field,
        ));
    }

    ddl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
    }

    #[test]
    fn ddl_covers_declared_indexes() {
        let ddl = ddl_for(&schema::MESSAGES);
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS messages"));
        assert!(ddl.contains("idx_messages_by_author"));
        assert!(ddl.contains("idx_messages_by_conversation"));
        assert!(ddl.contains("messages_search_body USING fts5(body)"));

        let ddl = ddl_for(&schema::USERS);
        assert!(ddl.contains("idx_users_by_token"));
        assert!(ddl.contains("idx_users_by_name"));
        assert!(!ddl.contains("fts5"));
    }
}
