//! Schema declarations for the document store.
//!
//! Tables and their indexes are fixed at compile time. Migrations derive DDL
//! from these definitions, and the query builder only accepts indexes declared
//! here, so an index name can never drift from the structure backing it.

/// A document table: a name plus its declared access paths.
pub struct TableDef {
    pub name: &'static str,
    /// Exact-lookup indexes, in declaration order. Declaration order doubles
    /// as filter priority when a caller supplies more than one index filter.
    pub indexes: &'static [&'static IndexDef],
    /// At most one full-text index per table.
    pub search_index: Option<&'static SearchIndexDef>,
}

/// An exact-lookup index over one top-level document field.
pub struct IndexDef {
    pub name: &'static str,
    pub field: &'static str,
}

/// A full-text index over one top-level document field. Matching against it
/// also fixes result order (descending relevance).
pub struct SearchIndexDef {
    pub name: &'static str,
    pub field: &'static str,
}

impl TableDef {
    /// Name of the FTS shadow table backing `index`.
    pub(crate) fn search_table(&self, index: &SearchIndexDef) -> String {
        format!("{}_{}", self.name, index.name)
    }
}

// -- Messages --

pub static MESSAGES_BY_AUTHOR: IndexDef = IndexDef {
    name: "by_author",
    field: "author",
};

pub static MESSAGES_BY_CONVERSATION: IndexDef = IndexDef {
    name: "by_conversation",
    field: "conversation",
};

pub static MESSAGES_SEARCH_BODY: SearchIndexDef = SearchIndexDef {
    name: "search_body",
    field: "body",
};

pub static MESSAGES: TableDef = TableDef {
    name: "messages",
    indexes: &[&MESSAGES_BY_AUTHOR, &MESSAGES_BY_CONVERSATION],
    search_index: Some(&MESSAGES_SEARCH_BODY),
};

// -- Users --

pub static USERS_BY_TOKEN: IndexDef = IndexDef {
    name: "by_token",
    field: "token_identifier",
};

pub static USERS_BY_NAME: IndexDef = IndexDef {
    name: "by_name",
    field: "name",
};

pub static USERS: TableDef = TableDef {
    name: "users",
    indexes: &[&USERS_BY_TOKEN, &USERS_BY_NAME],
    search_index: None,
};

/// Every table the store knows about; migrations walk this list.
pub static TABLES: &[&TableDef] = &[&MESSAGES, &USERS];
