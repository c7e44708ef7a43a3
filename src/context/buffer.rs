//! Bounded conversation window

use std::collections::VecDeque;
use std::fmt;

/// Characters of each exchange kept in a spoken summary
pub const SUMMARY_CHARS: usize = 120;

/// Separator between exchanges in a spoken summary
pub const SUMMARY_DELIMITER: &str = " | ";

/// Who produced an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The person talking to the assistant
    User,
    /// The assistant's reply
    Assistant,
}

impl Role {
    /// Wire name used by chat-completion APIs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Label used when reading the history back to the user
    #[must_use]
    pub const fn speaker(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    role: Role,
    content: String,
}

impl Exchange {
    /// Create an exchange
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user exchange
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant exchange
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Render as `<Speaker>: <content>` with the content cut to `limit`
    /// characters and newlines flattened
    #[must_use]
    pub fn summary_line(&self, limit: usize) -> String {
        let flat: String = self
            .content
            .chars()
            .take(limit)
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!("{}: {flat}", self.role.speaker())
    }
}

/// Sliding window over the most recent exchanges
///
/// Holds at most `2 * max_exchanges` entries (one user plus one assistant
/// message per exchange). When an append pushes it past the bound the
/// oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    entries: VecDeque<Exchange>,
    max_exchanges: usize,
}

impl ContextBuffer {
    /// Create an empty buffer keeping `max_exchanges` user/assistant pairs
    #[must_use]
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_exchanges.saturating_mul(2)),
            max_exchanges,
        }
    }

    /// Configured exchange bound
    #[must_use]
    pub const fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    /// Maximum number of entries the buffer holds
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_exchanges.saturating_mul(2)
    }

    /// Append an exchange, evicting from the front to stay within bound
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push_back(Exchange::new(role, content));

        let capacity = self.capacity();
        while self.entries.len() > capacity {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::trace!(role = %evicted.role(), "evicted oldest exchange");
            }
        }
    }

    /// Drop every exchange
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Owned copy of the history in conversation order
    #[must_use]
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable rendering of the history, or `None` when empty
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.summary_line(SUMMARY_CHARS))
            .collect();
        Some(lines.join(SUMMARY_DELIMITER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_turn(buffer: &mut ContextBuffer, n: usize) {
        buffer.append(Role::User, format!("question {n}"));
        buffer.append(Role::Assistant, format!("answer {n}"));
    }

    #[test]
    fn new_buffer_is_empty() {
        let buffer = ContextBuffer::new(5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 10);
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn length_never_exceeds_bound() {
        let mut buffer = ContextBuffer::new(3);
        for n in 0..20 {
            buffer.append(Role::User, format!("msg {n}"));
            assert!(buffer.len() <= 6, "len {} after {n}", buffer.len());
        }
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buffer = ContextBuffer::new(2);
        for n in 0..3 {
            push_turn(&mut buffer, n);
        }

        let contents: Vec<String> = buffer
            .snapshot()
            .iter()
            .map(|e| e.content().to_string())
            .collect();
        assert_eq!(contents, ["question 1", "answer 1", "question 2", "answer 2"]);
    }

    #[test]
    fn odd_overflow_drops_single_entry() {
        let mut buffer = ContextBuffer::new(1);
        buffer.append(Role::User, "a");
        buffer.append(Role::Assistant, "b");
        buffer.append(Role::User, "c");

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot, vec![Exchange::assistant("b"), Exchange::user("c")]);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut buffer = ContextBuffer::new(0);
        buffer.append(Role::User, "hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_empties_snapshot() {
        let mut buffer = ContextBuffer::new(4);
        push_turn(&mut buffer, 0);
        push_turn(&mut buffer, 1);

        buffer.clear();
        assert!(buffer.snapshot().is_empty());
        assert!(buffer.summary().is_none());
    }

    #[test]
    fn snapshot_is_idempotent_and_detached() {
        let mut buffer = ContextBuffer::new(4);
        push_turn(&mut buffer, 0);

        let first = buffer.snapshot();
        let second = buffer.snapshot();
        assert_eq!(first, second);

        let mut copy = buffer.snapshot();
        copy.clear();
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn summary_truncates_and_flattens() {
        let mut buffer = ContextBuffer::new(2);
        buffer.append(Role::User, "line one\nline two");
        buffer.append(Role::Assistant, "x".repeat(200));

        let summary = buffer.summary().unwrap();
        let parts: Vec<&str> = summary.split(SUMMARY_DELIMITER).collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "You: line one line two");
        assert_eq!(parts[1], format!("Assistant: {}", "x".repeat(SUMMARY_CHARS)));
    }

    #[test]
    fn summary_counts_characters_not_bytes() {
        let line = Exchange::user("é".repeat(130)).summary_line(SUMMARY_CHARS);
        assert_eq!(line.chars().count(), "You: ".len() + SUMMARY_CHARS);
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
