//! Bounded rolling window of conversation exchanges.
//!
//! Appending beyond capacity evicts the oldest exchange first. Order is
//! insertion order and is never changed.

use paperchat_core::Exchange;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Capacity used when none is configured.
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// The last `max_messages` exchanges of one session, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    max_messages: usize,
    exchanges: VecDeque<Exchange>,
}

/// Snapshot of how full a memory window is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub current_messages: usize,
    pub max_messages: usize,
    pub remaining_capacity: usize,
}

impl ConversationMemory {
    /// Create an empty window. A capacity of 0 retains nothing.
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            exchanges: VecDeque::with_capacity(max_messages.min(64)),
        }
    }

    /// Push an exchange at the tail, evicting from the head while over capacity.
    pub fn append(&mut self, exchange: Exchange) {
        self.exchanges.push_back(exchange);
        while self.exchanges.len() > self.max_messages {
            self.exchanges.pop_front();
        }
    }

    /// All retained exchanges, oldest first.
    pub fn get_all(&self) -> Vec<Exchange> {
        self.exchanges.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn size(&self) -> usize {
        self.exchanges.len()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// The last `count` exchanges, still in insertion order.
    pub fn recent(&self, count: usize) -> Vec<Exchange> {
        let skip = self.exchanges.len().saturating_sub(count);
        self.exchanges.iter().skip(skip).cloned().collect()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            current_messages: self.size(),
            max_messages: self.max_messages,
            remaining_capacity: self.max_messages.saturating_sub(self.size()),
        }
    }

    /// Copy of the history suitable for serialization.
    pub fn export(&self) -> Vec<Exchange> {
        self.get_all()
    }

    /// Replace the history with `history`, keeping only its last
    /// `max_messages` entries.
    pub fn import(&mut self, history: Vec<Exchange>) {
        self.clear();
        let skip = history.len().saturating_sub(self.max_messages);
        if skip > 0 {
            tracing::debug!(
                dropped = skip,
                kept = self.max_messages,
                "Imported history exceeds capacity"
            );
        }
        self.exchanges.extend(history.into_iter().skip(skip));
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperchat_core::Role;

    fn texts(memory: &ConversationMemory) -> Vec<String> {
        memory.get_all().iter().map(|e| e.text().to_string()).collect()
    }

    #[test]
    fn append_within_capacity_keeps_everything() {
        let mut memory = ConversationMemory::new(3);
        memory.append(Exchange::user("a"));
        memory.append(Exchange::assistant("b"));
        assert_eq!(memory.size(), 2);
        assert_eq!(texts(&memory), vec!["a", "b"]);
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut memory = ConversationMemory::new(3);
        for i in 0..5 {
            memory.append(Exchange::user(i.to_string()));
        }
        assert_eq!(memory.size(), 3);
        assert_eq!(texts(&memory), vec!["2", "3", "4"]);
    }

    #[test]
    fn many_appends_keep_the_last_max_in_order() {
        let mut memory = ConversationMemory::new(10);
        for i in 0..37 {
            memory.append(Exchange::user(format!("m{i}")));
            assert!(memory.size() <= 10);
        }
        let expected: Vec<String> = (27..37).map(|i| format!("m{i}")).collect();
        assert_eq!(texts(&memory), expected);
    }

    #[test]
    fn twelve_pairs_with_default_capacity() {
        let mut memory = ConversationMemory::default();
        for i in 1..=12 {
            memory.append(Exchange::user(format!("u{i}")));
            memory.append(Exchange::assistant(format!("a{i}")));
        }
        assert_eq!(memory.size(), 10);

        let all = memory.get_all();
        assert_eq!(all[0].text(), "u8");
        assert_eq!(all[0].role(), Role::User);
        assert_eq!(all[9].text(), "a12");
        for i in 1..=7 {
            assert!(!all.iter().any(|e| e.text() == format!("u{i}")));
            assert!(!all.iter().any(|e| e.text() == format!("a{i}")));
        }
    }

    #[test]
    fn clear_empties_the_window() {
        let mut memory = ConversationMemory::new(4);
        memory.append(Exchange::user("x"));
        memory.clear();
        assert!(memory.is_empty());
        assert!(memory.get_all().is_empty());

        memory.clear();
        assert_eq!(memory.size(), 0);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut memory = ConversationMemory::new(0);
        memory.append(Exchange::user("gone"));
        assert_eq!(memory.size(), 0);
        assert_eq!(memory.stats().remaining_capacity, 0);
    }

    #[test]
    fn get_all_is_a_snapshot() {
        let mut memory = ConversationMemory::new(2);
        memory.append(Exchange::user("first"));
        let snapshot = memory.get_all();
        memory.append(Exchange::user("second"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(memory.size(), 2);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut memory = ConversationMemory::new(5);
        for t in ["a", "b", "c"] {
            memory.append(Exchange::user(t));
        }
        let recent: Vec<String> = memory.recent(2).iter().map(|e| e.text().into()).collect();
        assert_eq!(recent, vec!["b", "c"]);
        assert_eq!(memory.recent(10).len(), 3);
        assert!(memory.recent(0).is_empty());
    }

    #[test]
    fn stats_track_capacity() {
        let mut memory = ConversationMemory::new(4);
        memory.append(Exchange::user("q"));
        assert_eq!(
            memory.stats(),
            MemoryStats {
                current_messages: 1,
                max_messages: 4,
                remaining_capacity: 3,
            }
        );
    }

    #[test]
    fn import_keeps_last_max_entries() {
        let mut memory = ConversationMemory::new(3);
        memory.append(Exchange::user("old"));

        let history: Vec<Exchange> = (0..5)
            .map(|i| Exchange::untimed(Role::User, i.to_string()))
            .collect();
        memory.import(history);

        assert_eq!(texts(&memory), vec!["2", "3", "4"]);
    }

    #[test]
    fn export_then_import_preserves_history() {
        let mut memory = ConversationMemory::new(4);
        memory.append(Exchange::user("hi"));
        memory.append(Exchange::assistant("hello"));

        let json = serde_json::to_string(&memory.export()).unwrap();
        let mut restored = ConversationMemory::new(4);
        restored.import(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.get_all(), memory.get_all());
    }
}
