//! Bounded conversation log

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of exchanges kept
pub const DEFAULT_CAPACITY: usize = 50;

/// One completed exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What the user said
    pub user: String,
    /// What the assistant replied
    pub assistant: String,
    /// When the exchange completed (serialized as RFC 3339)
    pub timestamp: DateTime<Utc>,
}

/// Append-only sliding window of exchanges, oldest evicted first
#[derive(Debug, Clone)]
pub struct ConversationLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ConversationLog {
    /// Log holding at most `capacity` entries (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an exchange timestamped now
    pub fn append(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.append_at(user, assistant, Utc::now());
    }

    /// Record an exchange with an explicit timestamp
    pub fn append_at(
        &mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) {
        self.entries.push_back(HistoryEntry {
            user: user.into(),
            assistant: assistant.into(),
            timestamp,
        });

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::trace!(user = %evicted.user, "evicted oldest history entry");
            }
        }
    }

    /// Entries, most recent first
    #[must_use]
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
