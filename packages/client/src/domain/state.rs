//! Connection state of a session channel.

use std::fmt;

/// Lifecycle state of a [`SessionChannel`](crate::session::SessionChannel).
///
/// `Closed` is terminal. Every other state can be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket resources are held
    Disconnected,
    /// Transport connect and token presentation are in flight
    Connecting,
    /// Handshake completed, messages flow both ways
    Connected,
    /// Connection dropped unexpectedly, retrying with the same token
    Reconnecting { attempt: u32 },
    /// Closed by the owner, no further transitions
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
