//! Session channel settings.

use std::time::Duration;

use reqwest::Url;

use crate::domain::RoomName;

/// Default number of messages kept while the channel is not connected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// What `send` does while the channel is not `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPolicy {
    /// Keep up to `capacity` messages and flush them in order once connected
    Queue { capacity: usize },
    /// Fail immediately with `NotConnected`
    Reject,
}

impl Default for SendPolicy {
    fn default() -> Self {
        SendPolicy::Queue {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Backoff between reconnect attempts.
///
/// The delay doubles with every attempt, starting at `initial_delay` and
/// capped at `max_delay`. `max_attempts: None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether attempt number `attempt` may still be made.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Settings of one session channel.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Socket.IO WebSocket URL
    pub socket_url: Url,
    /// Room outgoing messages are addressed to
    pub room: RoomName,
    pub send_policy: SendPolicy,
    pub reconnect: ReconnectPolicy,
    /// Upper bound for connect + Socket.IO handshake
    pub handshake_timeout: Duration,
}

impl SessionConfig {
    /// Settings for `socket_url` with defaults for everything else.
    pub fn new(socket_url: Url) -> Self {
        Self {
            socket_url,
            room: RoomName::default(),
            send_policy: SendPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            handshake_timeout: Duration::from_secs(20),
        }
    }
}
