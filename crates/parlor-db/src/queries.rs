//! Domain operations over the `messages` and `users` tables.
//!
//! Each list operation builds one staged query whose shape depends on which
//! optional arguments are present. Filter priority is fixed and documented: a
//! text-search filter wins outright (it fixes index and order together), then
//! named index filters in schema declaration order (`author` before
//! `conversation`, `token_identifier` before `name`), then a plain
//! creation-order walk. No combination of arguments can fail to build.

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use parlor_types::models::{Message, User};

use crate::Database;
use crate::document::{DocumentId, Stored};
use crate::query::{Order, OrderedScan};
use crate::schema;

/// Result bound for every list operation.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Default, Clone)]
pub struct ListMessages {
    pub author: Option<String>,
    pub conversation: Option<String>,
    pub body: Option<String>,
    pub exclude_hidden: bool,
    pub newest_first: bool,
}

#[derive(Debug, Default, Clone)]
pub struct ListUsers {
    pub name: Option<String>,
    pub token_identifier: Option<String>,
    pub only_active: bool,
    pub descending: bool,
}

impl Database {
    // -- Messages --

    pub fn create_message(&self, message: &Message) -> Result<DocumentId> {
        self.insert(&schema::MESSAGES, serde_json::to_value(message)?)
    }

    pub fn list_messages(&self, args: &ListMessages) -> Result<Vec<Stored<Message>>> {
        let q = self.message_scan(args);
        debug!(plan = ?q.plan(), "list_messages");
        q.take(PAGE_SIZE)?.iter().map(Stored::decode).collect()
    }

    /// Builder chain for message listing, kept separate so the chosen plan
    /// can be inspected before materialization.
    fn message_scan(&self, args: &ListMessages) -> OrderedScan<'_> {
        let order = if args.newest_first { Order::Desc } else { Order::Asc };
        let scan = self.query(&schema::MESSAGES);

        // A body filter is applied to the unindexed handle and fixes the
        // order too, so `newest_first` and any author/conversation filter are
        // deliberately left unused on that branch.
        let mut q = if let Some(body) = &args.body {
            scan.with_search_index(&schema::MESSAGES_SEARCH_BODY, body.as_str())
        } else if let Some(author) = &args.author {
            scan.with_index(&schema::MESSAGES_BY_AUTHOR, author.as_str())
                .order(order)
        } else if let Some(conversation) = &args.conversation {
            scan.with_index(&schema::MESSAGES_BY_CONVERSATION, conversation.as_str())
                .order(order)
        } else {
            scan.order(order)
        };

        if args.exclude_hidden {
            q = q.filter(|doc| doc.field("hidden").and_then(Value::as_bool) != Some(true));
        }

        q
    }

    // -- Users --

    pub fn create_user(&self, user: &User) -> Result<DocumentId> {
        self.insert(&schema::USERS, serde_json::to_value(user)?)
    }

    pub fn list_users(&self, args: &ListUsers) -> Result<Vec<Stored<User>>> {
        let q = self.user_scan(args);
        debug!(plan = ?q.plan(), "list_users");
        q.take(PAGE_SIZE)?.iter().map(Stored::decode).collect()
    }

    fn user_scan(&self, args: &ListUsers) -> OrderedScan<'_> {
        let order = if args.descending { Order::Desc } else { Order::Asc };
        let scan = self.query(&schema::USERS);

        let mut q = if let Some(token) = &args.token_identifier {
            scan.with_index(&schema::USERS_BY_TOKEN, token.as_str())
                .order(order)
        } else if let Some(name) = &args.name {
            scan.with_index(&schema::USERS_BY_NAME, name.as_str())
                .order(order)
        } else {
            scan.order(order)
        };

        if args.only_active {
            q = q.filter(|doc| doc.field("status").and_then(Value::as_str) == Some("active"));
        }

        q
    }
}
