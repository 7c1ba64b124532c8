use serde::{Deserialize, Serialize};

/// A chat message. The document store assigns identity and creation time at
/// insert; these fields hold only what the caller provides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub author: String,
    pub conversation: String,
    pub body: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    /// Opaque identity token, assumed unique per identity. Uniqueness is not
    /// enforced by the store.
    pub token_identifier: String,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}
