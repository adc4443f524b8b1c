use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Username shown for events the server emits outside of the message format
pub const SYSTEM_USERNAME: &str = "SERVER";

/// A user of the chat, identified for the lifetime of a single client session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Randomly generated identifier of the user
    pub id: Uuid,
    /// The display name chosen by the user
    pub username: String,
}

impl UserIdentity {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// The sentinel sender attached to events which could not be decoded as a [Message]
    pub fn system() -> Self {
        Self::new(Uuid::nil(), SYSTEM_USERNAME)
    }

    pub fn is_system(&self) -> bool {
        self.id.is_nil() && self.username == SYSTEM_USERNAME
    }
}

/// Opaque room token issued by the server when a room is created
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A text message broadcast to everyone subscribed to a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier generated by the sending client
    pub id: Uuid,
    /// The user that has sent the message
    pub sender: UserIdentity,
    /// The content of the message
    pub content: String,
}

impl Message {
    pub fn new(id: Uuid, sender: UserIdentity, content: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            content: content.into(),
        }
    }
}
