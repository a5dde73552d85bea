//! Socket.IO payload DTOs.

use serde::{Deserialize, Serialize};

/// Engine.IO open packet payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// Auth object sent with the Socket.IO CONNECT packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeAuth {
    pub token: String,
}

/// Payload of a CONNECT_ERROR packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

/// Outbound `send_message` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessagePayload {
    pub room: String,
    pub text: String,
}

/// Inbound `new_message` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessagePayload {
    pub user: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

/// Inbound `rate_limited` event payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitedPayload {
    #[serde(default)]
    pub msg: String,
}

/// Event names used on the wire.
pub mod event {
    pub const SEND_MESSAGE: &str = "send_message";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const RATE_LIMITED: &str = "rate_limited";
}
