use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, User, UserStatus};

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListMessagesQuery {
    pub author: Option<String>,
    pub conversation: Option<String>,
    /// Full-text filter over message bodies. When present it takes priority
    /// over `author` and `conversation` and results come back in relevance
    /// order.
    pub body: Option<String>,
    #[serde(default)]
    pub exclude_hidden: bool,
    #[serde(default)]
    pub newest_first: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub author: String,
    pub conversation: String,
    pub body: String,
    #[serde(default)]
    pub hidden: bool,
}

impl From<CreateMessageRequest> for Message {
    fn from(req: CreateMessageRequest) -> Self {
        Message {
            author: req.author,
            conversation: req.conversation,
            body: req.body,
            hidden: req.hidden,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub author: String,
    pub conversation: String,
    pub body: String,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListUsersQuery {
    pub name: Option<String>,
    pub token_identifier: Option<String>,
    #[serde(default)]
    pub only_active: bool,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub name: String,
    pub token_identifier: String,
    pub status: UserStatus,
}

impl From<CreateUserRequest> for User {
    fn from(req: CreateUserRequest) -> Self {
        User {
            name: req.name,
            token_identifier: req.token_identifier,
            status: req.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub token_identifier: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// Acknowledgement for a create: the id the store assigned.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}
