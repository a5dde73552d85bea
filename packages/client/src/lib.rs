//! Realtime chat client library.
//!
//! The client turns a username/password pair into a bearer token
//! ([`CredentialExchange`](domain::CredentialExchange)) and keeps one
//! authenticated Socket.IO channel alive with it
//! ([`SessionChannel`](session::SessionChannel)). Inbound messages are
//! delivered to subscribers in arrival order. Outbound messages go through a
//! FIFO outbox that survives reconnects.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod session;
pub mod ui;
pub mod usecase;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export entry points
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::{SessionChannel, SessionEvent, Subscription};
pub use ui::run_client;
