//! FIFO of encoded outbound frames.

use std::collections::VecDeque;

/// Frames waiting for a connected transport.
///
/// A frame is removed only after the transport accepted it, so a write that
/// fails leaves it at the head for the next connection.
#[derive(Debug, Default)]
pub struct Outbox {
    frames: VecDeque<String>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: String) {
        self.frames.push_back(frame);
    }

    /// Copy of the oldest frame.
    pub fn front(&self) -> Option<String> {
        self.frames.front().cloned()
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.frames.pop_front()
    }

    /// Drop every pending frame and return how many there were.
    pub fn clear(&mut self) -> usize {
        let dropped = self.frames.len();
        self.frames.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        // テスト項目: 追加した順に取り出される
        // given (前提条件):
        let mut outbox = Outbox::new();
        outbox.push("a".to_string());
        outbox.push("b".to_string());

        // when (操作):
        let first = outbox.pop_front();
        let second = outbox.pop_front();

        // then (期待する結果):
        assert_eq!(first.as_deref(), Some("a"));
        assert_eq!(second.as_deref(), Some("b"));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_front_does_not_remove() {
        // テスト項目: front は要素を取り除かない
        // given (前提条件):
        let mut outbox = Outbox::new();
        outbox.push("a".to_string());

        // when (操作):
        let peeked = outbox.front();

        // then (期待する結果):
        assert_eq!(peeked.as_deref(), Some("a"));
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_clear_returns_dropped_count() {
        // テスト項目: clear で破棄した件数が返る
        // given (前提条件):
        let mut outbox = Outbox::new();
        outbox.push("a".to_string());
        outbox.push("b".to_string());

        // when (操作):
        let dropped = outbox.clear();

        // then (期待する結果):
        assert_eq!(dropped, 2);
        assert!(outbox.is_empty());
    }
}
