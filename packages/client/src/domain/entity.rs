//! Domain entities for the chat client.

use super::{
    error::ValueObjectError,
    value_object::{MessageText, Password, RoomName, Username},
};

/// Username/password pair presented to the token endpoint.
///
/// Lives only for one exchange call and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: Username,
    pub password: Password,
}

impl Credential {
    pub fn new(username: Username, password: Password) -> Self {
        Self { username, password }
    }

    /// Validate raw input. Both fields must be non-empty.
    pub fn parse(username: String, password: String) -> Result<Self, ValueObjectError> {
        Ok(Self::new(Username::new(username)?, Password::new(password)?))
    }
}

/// Message the local user wants to send.
///
/// The sender is assigned by the server, so there is no `user` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub room: RoomName,
    pub text: MessageText,
}

impl OutgoingMessage {
    pub fn new(room: RoomName, text: MessageText) -> Self {
        Self { room, text }
    }
}

/// Message delivered by the server.
///
/// Inbound payloads are displayed as-is, so fields are plain strings rather
/// than validated value objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub room: String,
    pub user: String,
    pub text: String,
    /// Server timestamp in Unix seconds, when the server attached one
    pub ts: Option<i64>,
}
