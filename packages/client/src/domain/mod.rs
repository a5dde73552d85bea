//! Domain layer for the chat client.
//!
//! This module contains the client's business types (credentials, messages,
//! connection state) and the ports the outer layers implement. It does not
//! know about HTTP, WebSocket or Socket.IO framing.

pub mod entity;
pub mod error;
pub mod port;
pub mod state;
pub mod value_object;

pub use entity::{Credential, InboundMessage, OutgoingMessage};
pub use error::ValueObjectError;
pub use port::CredentialExchange;
#[cfg(test)]
pub use port::MockCredentialExchange;
pub use state::ConnectionState;
pub use value_object::{MessageText, Password, RoomName, Token, Username};
