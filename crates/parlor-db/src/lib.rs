pub mod document;
pub mod migrations;
pub mod queries;
pub mod query;
pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use document::DocumentId;
use query::TableScan;
use schema::TableDef;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// First construction stage: bind to one table. Always succeeds and
    /// yields an unindexed, unordered query handle.
    pub fn query(&self, table: &'static TableDef) -> TableScan<'_> {
        TableScan::new(self, table)
    }

    /// Insert `data` as a new document. Identity and creation time are
    /// assigned here; the body is stored verbatim with no validation beyond
    /// being JSON. If the table declares a search index, the indexed field is
    /// mirrored into the FTS shadow table in the same call.
    pub fn insert(&self, table: &'static TableDef, data: Value) -> Result<DocumentId> {
        let id = DocumentId::generate();
        let created_at = chrono::Utc::now().timestamp_millis();

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, created_at, data) VALUES (?1, ?2, ?3)",
                    table.name
                ),
                rusqlite::params![id.to_string(), created_at, data.to_string()],
            )?;

            if let Some(search) = table.search_index {
                let rowid = conn.last_insert_rowid();
                let text = data.get(search.field).and_then(Value::as_str).unwrap_or_default();
                conn.execute(
                    &format!(
                        "INSERT INTO {} (rowid, {}) VALUES (?1, ?2)",
                        table.search_table(search),
                        search.field
                    ),
                    rusqlite::params![rowid, text],
                )?;
            }

            Ok(())
        })?;

        Ok(id)
    }
}
