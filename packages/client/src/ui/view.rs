//! Conversation view: what the terminal shows.

use std::collections::VecDeque;

use tsudoi_shared::time::{format_unix_secs_jst, now_jst_clock};

use crate::domain::InboundMessage;

/// Received messages, newest first.
///
/// Populated only from session events. Reconnects never clear it.
#[derive(Debug, Default)]
pub struct ConversationView {
    messages: VecDeque<InboundMessage>,
}

impl ConversationView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a received message.
    pub fn push(&mut self, message: InboundMessage) {
        self.messages.push_front(message);
    }

    /// Messages, newest first.
    pub fn messages(&self) -> impl Iterator<Item = &InboundMessage> {
        self.messages.iter()
    }

    pub fn latest(&self) -> Option<&InboundMessage> {
        self.messages.front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// `[HH:MM:SS] user: text`, using the server timestamp when present.
pub fn render_message(message: &InboundMessage) -> String {
    let clock = message
        .ts
        .and_then(format_unix_secs_jst)
        .unwrap_or_else(now_jst_clock);
    format!("[{}] {}: {}", clock, message.user, message.text)
}
