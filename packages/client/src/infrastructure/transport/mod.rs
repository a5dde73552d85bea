//! Frame transport used by the session driver.
//!
//! The driver only deals in text frames. [`Connector`] opens a fresh
//! [`Transport`] for every (re)connect attempt.

pub mod websocket;

use async_trait::async_trait;

use crate::error::ClientError;

pub use websocket::{WsConnector, WsTransport};

/// A connected, bidirectional text frame stream.
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame.
    async fn send(&mut self, frame: String) -> Result<(), ClientError>;

    /// Read the next text frame.
    ///
    /// Returns `None` once the peer closed the connection. Must be
    /// cancel-safe: it is polled inside `tokio::select!`.
    async fn recv(&mut self) -> Option<Result<String, ClientError>>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Opens transports to a URL.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ClientError>;
}
