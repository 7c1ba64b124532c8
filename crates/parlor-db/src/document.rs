use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity assigned by the store at insert time. Immutable for the life of
/// the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub(crate) fn parse(s: &str) -> Result<Self> {
        let uuid = s
            .parse()
            .with_context(|| format!("corrupt document id '{s}'"))?;
        Ok(Self(uuid))
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A raw stored document: the system fields plus the caller-provided body,
/// exactly as it went in.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    /// Creation time in UTC milliseconds, fixed at insert. Default sort key.
    pub created_at: i64,
    pub data: Value,
}

impl Document {
    /// Top-level field access, for post-filter predicates.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// A document decoded into its typed model.
#[derive(Debug, Clone)]
pub struct Stored<T> {
    pub id: DocumentId,
    pub created_at: DateTime<Utc>,
    pub value: T,
}

impl<T: DeserializeOwned> Stored<T> {
    pub fn decode(doc: &Document) -> Result<Self> {
        let value = serde_json::from_value(doc.data.clone())
            .with_context(|| format!("decoding document {}", doc.id))?;
        let created_at = DateTime::from_timestamp_millis(doc.created_at)
            .with_context(|| format!("document {} has an out-of-range timestamp", doc.id))?;
        Ok(Stored {
            id: doc.id,
            created_at,
            value,
        })
    }
}
