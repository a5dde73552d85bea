//! Session channel: one authenticated, long-lived Socket.IO connection.
//!
//! A [`SessionChannel`] is created from a [`Token`](crate::domain::Token) and
//! owns a background driver task that connects, answers heartbeats, flushes
//! the outbox and reconnects after unexpected disconnects. Callers observe
//! the channel through [`SessionEvent`]s and the state watch.

pub mod channel;
pub mod config;
mod driver;
pub mod outbox;
pub mod subscription;

pub use channel::SessionChannel;
pub use config::{ReconnectPolicy, SendPolicy, SessionConfig};
pub use subscription::{EventKind, SessionEvent, StopReason, Subscription};
