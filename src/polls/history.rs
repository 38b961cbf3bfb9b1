//! Poll History
//!
//! Append-only record of concluded polls, in closure order.

use serde::{Deserialize, Serialize};

use super::config::Poll;
use super::tally::TallySnapshot;

/// Why voting ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClosureReason {
    /// The duration timer fired
    Timer,
    /// Every connected participant voted
    AllVoted,
}

/// Snapshot of one concluded poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub poll: Poll,
    pub tally: TallySnapshot,
    /// When voting closed (Unix ms)
    pub closed_at: i64,
    pub reason: ClosureReason,
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Full ordered history, oldest first.
    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}
