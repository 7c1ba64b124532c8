//! Staged query construction.
//!
//! A query is assembled in stages, and each stage has its own type, so the
//! set of legal next calls shrinks as the query takes shape:
//!
//! - [`TableScan`]: unindexed, unordered. Offers `with_index`,
//!   `with_search_index`, and `order`.
//! - [`IndexedScan`]: one index selected, still unordered. Offers only
//!   `order`.
//! - [`OrderedScan`]: access path and order both fixed. Offers only `filter`
//!   and `take`.
//!
//! Every transition consumes its handle by value, so no runtime branch can
//! apply two index selections or two orderings. A text-search selection jumps
//! from `TableScan` straight to `OrderedScan` because relevance ranking fixes
//! the order as well; there is no path from `IndexedScan` to a search, which
//! keeps "search index plus secondary index" unrepresentable.

use anyhow::Result;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use thiserror::Error;

use crate::Database;
use crate::document::{Document, DocumentId};
use crate::schema::{IndexDef, SearchIndexDef, TableDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Raised when a search scan's match expression is rejected by the FTS
/// parser. Callers can downcast for this to report bad input instead of an
/// internal failure.
#[derive(Debug, Error)]
#[error("malformed search query '{query}'")]
pub struct MalformedSearchQuery {
    pub query: String,
    #[source]
    pub source: rusqlite::Error,
}

/// Which access path a finished query uses. One selection per query, by
/// construction; exposed for logging and for structural assertions in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// No index filter; walk the whole table in creation order.
    FullScan,
    /// Exact lookup through one declared index.
    Index(&'static str),
    /// Full-text match; implies descending-relevance order.
    Search(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub table: &'static str,
    pub selection: Selection,
    pub order: Order,
}

/// Stage 1 handle: bound to a table, nothing else decided.
pub struct TableScan<'a> {
    db: &'a Database,
    table: &'static TableDef,
}

/// Stage 2 handle: one index selected, order still open.
pub struct IndexedScan<'a> {
    db: &'a Database,
    table: &'static TableDef,
    index: &'static IndexDef,
    key: Value,
}

/// Stage 3+ handle: access path and order fixed; only post-filters and
/// materialization remain.
pub struct OrderedScan<'a> {
    db: &'a Database,
    table: &'static TableDef,
    selection: SelectionArgs,
    order: Order,
    post_filters: Vec<Box<dyn Fn(&Document) -> bool>>,
}

enum SelectionArgs {
    FullScan,
    Index {
        index: &'static IndexDef,
        key: Value,
    },
    Search {
        index: &'static SearchIndexDef,
        query: String,
    },
}

impl<'a> TableScan<'a> {
    pub(crate) fn new(db: &'a Database, table: &'static TableDef) -> Self {
        Self { db, table }
    }

    /// Select one declared index and constrain it to `key`. Consumes the
    /// unindexed handle; the result offers no further index selection.
    pub fn with_index(self, index: &'static IndexDef, key: impl Into<Value>) -> IndexedScan<'a> {
        IndexedScan {
            db: self.db,
            table: self.table,
            index,
            key: key.into(),
        }
    }

    /// Select the table's search index. This fixes both the access path and
    /// the order (descending relevance) in one step, which is why it is only
    /// reachable from the unindexed handle.
    pub fn with_search_index(
        self,
        index: &'static SearchIndexDef,
        query: impl Into<String>,
    ) -> OrderedScan<'a> {
        OrderedScan {
            db: self.db,
            table: self.table,
            selection: SelectionArgs::Search {
                index,
                query: query.into(),
            },
            order: Order::Desc,
            post_filters: Vec::new(),
        }
    }

    /// Fix creation order over the whole table without selecting an index.
    pub fn order(self, order: Order) -> OrderedScan<'a> {
        OrderedScan {
            db: self.db,
            table: self.table,
            selection: SelectionArgs::FullScan,
            order,
            post_filters: Vec::new(),
        }
    }
}

impl<'a> IndexedScan<'a> {
    /// Fix creation order within the selected index range.
    pub fn order(self, order: Order) -> OrderedScan<'a> {
        OrderedScan {
            db: self.db,
            table: self.table,
            selection: SelectionArgs::Index {
                index: self.index,
                key: self.key,
            },
            order,
            post_filters: Vec::new(),
        }
    }
}

impl OrderedScan<'_> {
    /// Add a post-filter. Runs per candidate document after the access path
    /// and order are already fixed, so it can only drop documents, never
    /// reorder them. Repeatable; predicates are ANDed.
    pub fn filter(mut self, pred: impl Fn(&Document) -> bool + 'static) -> Self {
        self.post_filters.push(Box::new(pred));
        self
    }

    pub fn plan(&self) -> PlanSummary {
        let selection = match &self.selection {
            SelectionArgs::FullScan => Selection::FullScan,
            SelectionArgs::Index { index, .. } => Selection::Index(index.name),
            SelectionArgs::Search { index, .. } => Selection::Search(index.name),
        };
        PlanSummary {
            table: self.table.name,
            selection,
            order: self.order,
        }
    }

    /// Materialize at most `max` documents. Rows stream out of the statement
    /// lazily and iteration stops as soon as `max` documents survive the
    /// post-filters.
    pub fn take(self, max: usize) -> Result<Vec<Document>> {
        let (sql, params) = self.build_sql();

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query(rusqlite::params_from_iter(params.iter()))
                .map_err(|e| self.wrap_exec_error(e))?;

            let mut out = Vec::new();
            while out.len() < max {
                let row = match rows.next() {
                    Ok(Some(row)) => row,
                    Ok(None) => break,
                    Err(e) => return Err(self.wrap_exec_error(e)),
                };
                let doc = row_to_document(row)?;
                if self.post_filters.iter().all(|pred| pred(&doc)) {
                    out.push(doc);
                }
            }
            Ok(out)
        })
    }

    /// The search string is the only caller-controlled text that reaches the
    /// SQL layer unchecked, so a generic SQL error while executing a search
    /// scan means the match expression failed to parse. Operational failures
    /// carry distinct codes and pass through untouched.
    fn wrap_exec_error(&self, err: rusqlite::Error) -> anyhow::Error {
        if let SelectionArgs::Search { query, .. } = &self.selection {
            if let rusqlite::Error::SqliteFailure(cause, _) = &err {
                if cause.extended_code == rusqlite::ffi::SQLITE_ERROR {
                    return MalformedSearchQuery {
                        query: query.clone(),
                        source: err,
                    }
                    .into();
                }
            }
        }
        err.into()
    }

    fn build_sql(&self) -> (String, Vec<SqlValue>) {
        let t = self.table.name;
        let dir = match self.order {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        };

        match &self.selection {
            SelectionArgs::FullScan => (
                format!(
                    "SELECT id, created_at, data FROM {t}
                     ORDER BY created_at {dir}, rowid {dir}"
                ),
                Vec::new(),
            ),
            SelectionArgs::Index { index, key } => (
                format!(
                    "SELECT id, created_at, data FROM {t}
                     WHERE json_extract(data, '$.{f}') = ?1
                     ORDER BY created_at {dir}, rowid {dir}",
                    f = index.field,
                ),
                vec![json_to_sql(key)],
            ),
            // bm25 rank is more negative for better matches, so ascending
            // rank is descending relevance.
            SelectionArgs::Search { index, query } => (
                format!(
                    "SELECT t.id, t.created_at, t.data FROM {t} t
                     JOIN (SELECT rowid, rank FROM {st} WHERE {st} MATCH ?1) s
                       ON t.rowid = s.rowid
                     ORDER BY s.rank",
                    st = self.table.search_table(index),
                ),
                vec![SqlValue::Text(query.clone())],
            ),
        }
    }
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        // json_extract surfaces JSON booleans as 0/1
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> Result<Document> {
    let id: String = row.get(0)?;
    let created_at: i64 = row.get(1)?;
    let data: String = row.get(2)?;
    Ok(Document {
        id: DocumentId::parse(&id)?,
        created_at,
        data: serde_json::from_str(&data)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use serde_json::json;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn full_scan_plan() {
        let db = db();
        let plan = db.query(&schema::MESSAGES).order(Order::Asc).plan();
        assert_eq!(
            plan,
            PlanSummary {
                table: "messages",
                selection: Selection::FullScan,
                order: Order::Asc,
            }
        );
    }

    #[test]
    fn index_plan_records_one_selection() {
        let db = db();
        let plan = db
            .query(&schema::MESSAGES)
            .with_index(&schema::MESSAGES_BY_AUTHOR, "alice")
            .order(Order::Desc)
            .plan();
        assert_eq!(plan.selection, Selection::Index("by_author"));
        assert_eq!(plan.order, Order::Desc);
    }

    #[test]
    fn search_plan_fixes_order() {
        let db = db();
        let plan = db
            .query(&schema::MESSAGES)
            .with_search_index(&schema::MESSAGES_SEARCH_BODY, "hello")
            .plan();
        assert_eq!(plan.selection, Selection::Search("search_body"));
        assert_eq!(plan.order, Order::Desc);
    }

    #[test]
    fn post_filter_does_not_change_plan() {
        let db = db();
        let before = db.query(&schema::USERS).order(Order::Asc).plan();
        let after = db
            .query(&schema::USERS)
            .order(Order::Asc)
            .filter(|_| true)
            .filter(|_| false)
            .plan();
        assert_eq!(before, after);
    }

    #[test]
    fn take_bounds_and_orders_results() {
        let db = db();
        for i in 0..5 {
            db.insert(&schema::USERS, json!({ "name": format!("u{i}") }))
                .unwrap();
        }

        let docs = db.query(&schema::USERS).order(Order::Asc).take(3).unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|d| d.field("name").and_then(Value::as_str).unwrap().to_owned())
            .collect();
        assert_eq!(names, ["u0", "u1", "u2"]);

        let docs = db.query(&schema::USERS).order(Order::Desc).take(2).unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|d| d.field("name").and_then(Value::as_str).unwrap().to_owned())
            .collect();
        assert_eq!(names, ["u4", "u3"]);
    }

    #[test]
    fn index_selection_narrows_candidates() {
        let db = db();
        db.insert(&schema::MESSAGES, json!({ "author": "alice", "body": "a" }))
            .unwrap();
        db.insert(&schema::MESSAGES, json!({ "author": "bob", "body": "b" }))
            .unwrap();
        db.insert(&schema::MESSAGES, json!({ "author": "alice", "body": "c" }))
            .unwrap();

        let docs = db
            .query(&schema::MESSAGES)
            .with_index(&schema::MESSAGES_BY_AUTHOR, "alice")
            .order(Order::Asc)
            .take(10)
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(
            docs.iter()
                .all(|d| d.field("author").and_then(Value::as_str) == Some("alice"))
        );
    }

    #[test]
    fn search_matches_only_relevant_documents() {
        let db = db();
        db.insert(
            &schema::MESSAGES,
            json!({ "author": "alice", "body": "hello world" }),
        )
        .unwrap();
        db.insert(
            &schema::MESSAGES,
            json!({ "author": "bob", "body": "goodbye world" }),
        )
        .unwrap();

        let docs = db
            .query(&schema::MESSAGES)
            .with_search_index(&schema::MESSAGES_SEARCH_BODY, "hello")
            .take(10)
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].field("body").and_then(Value::as_str),
            Some("hello world")
        );
    }

    #[test]
    fn post_filter_preserves_relative_order() {
        let db = db();
        for i in 0..6 {
            db.insert(&schema::USERS, json!({ "name": format!("u{i}"), "keep": i % 2 == 0 }))
                .unwrap();
        }

        let docs = db
            .query(&schema::USERS)
            .order(Order::Asc)
            .filter(|d| d.field("keep").and_then(Value::as_bool) == Some(true))
            .take(10)
            .unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|d| d.field("name").and_then(Value::as_str).unwrap().to_owned())
            .collect();
        assert_eq!(names, ["u0", "u2", "u4"]);
    }

    #[test]
    fn take_keeps_scanning_past_filtered_rows() {
        // Post-filtered rows must not count against the bound.
        let db = db();
        for i in 0..8 {
            db.insert(&schema::USERS, json!({ "name": format!("u{i}"), "keep": i >= 4 }))
                .unwrap();
        }

        let docs = db
            .query(&schema::USERS)
            .order(Order::Asc)
            .filter(|d| d.field("keep").and_then(Value::as_bool) == Some(true))
            .take(3)
            .unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|d| d.field("name").and_then(Value::as_str).unwrap().to_owned())
            .collect();
        assert_eq!(names, ["u4", "u5", "u6"]);
    }
}
