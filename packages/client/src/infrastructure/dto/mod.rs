//! Data transfer objects exchanged with the server.

pub mod http;
pub mod socketio;
