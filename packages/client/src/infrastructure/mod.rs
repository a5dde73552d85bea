//! Infrastructure layer: HTTP credential exchange, Socket.IO framing and the
//! WebSocket transport.

pub mod dto;
pub mod exchange;
pub mod protocol;
pub mod transport;

pub use exchange::HttpCredentialExchange;
pub use transport::{Connector, Transport, WsConnector};
