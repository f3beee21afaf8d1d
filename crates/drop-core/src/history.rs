//! Bounded, most-recent-first log of received clipboard payloads.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// One received clip, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipEntry {
    /// Sender alias (or short id) at the time of receipt.
    pub from: String,
    /// The clip text, already truncated to the configured bound.
    pub payload: String,
    /// The sender's optional label, empty if absent.
    pub label: String,
    /// Wall-clock receipt time, seconds since the Unix epoch.
    pub received_at_secs: u64,
}

impl ClipEntry {
    /// Builds an entry stamped with the current wall-clock time.
    pub fn now(from: String, payload: String, label: String) -> Self {
        let received_at_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            from,
            payload,
            label,
            received_at_secs,
        }
    }
}

/// Ring of the most recent clips, newest first.
///
/// Holds at most `capacity` entries; appending at capacity evicts the
/// oldest. `snapshot` hands out an owned copy so readers are never
/// invalidated by later appends.
#[derive(Debug)]
pub struct HistoryRing {
    entries: VecDeque<ClipEntry>,
    capacity: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a new entry, evicting the oldest if the ring is full.
    pub fn append(&mut self, entry: ClipEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Owned most-recent-first copy of the ring.
    pub fn snapshot(&self) -> Vec<ClipEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
