//! Bounded history of inbound controller messages, newest first.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use roomhub_domain::id::RoomId;
use roomhub_domain::time::Timestamp;

pub const DEFAULT_CAPACITY: usize = 100;

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Applied,
    ForeignRoom,
    Ignored,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub received_at: Timestamp,
    /// Message kind tag, or `invalid` when the envelope did not decode.
    pub kind: String,
    pub room: Option<RoomId>,
    pub name: Option<String>,
    pub status: RouteStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStatistics {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_room: BTreeMap<u32, usize>,
    pub last: Option<HistoryEntry>,
}

pub struct MessageHistory {
    capacity: usize,
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MessageHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Entries, newest first, optionally filtered by kind tag and room.
    #[must_use]
    pub fn entries(&self, kind: Option<&str>, room: Option<RoomId>) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|entry| kind.is_none_or(|kind| entry.kind == kind))
            .filter(|entry| room.is_none_or(|room| entry.room == Some(room)))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn statistics(&self) -> HistoryStatistics {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = HistoryStatistics {
            total: entries.len(),
            last: entries.front().cloned(),
            ..HistoryStatistics::default()
        };
        for entry in entries.iter() {
            *stats.by_kind.entry(entry.kind.clone()).or_default() += 1;
            if let Some(room) = entry.room {
                *stats.by_room.entry(room.get()).or_default() += 1;
            }
        }
        stats
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
