//! Client-wide error definitions.

use thiserror::Error;

use crate::domain::{ConnectionState, ValueObjectError};

/// Errors surfaced by the chat client library.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The server could not be reached or the connection broke
    #[error("Transport error: {0}")]
    Transport(String),

    /// The token endpoint refused the credentials
    #[error("Authentication failed ({status}): {detail}")]
    Authentication { status: u16, detail: String },

    /// The registration endpoint refused the request
    #[error("Registration failed ({status}): {detail}")]
    Registration { status: u16, detail: String },

    /// The server sent something the client does not understand
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A send was attempted while the channel cannot accept it
    #[error("Session is not connected (state: {state})")]
    NotConnected { state: ConnectionState },

    /// The outbound queue is at capacity
    #[error("Outbound queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// User input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValueObjectError),
}
