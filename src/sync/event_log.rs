//! Bounded, in-memory record of recently observed events for status displays.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::sync::event::{CanonicalEvent, EventSource};

/// Running per-source counts. Never decremented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub primary: u64,
    pub secondary: u64,
    pub synced: u64,
}

impl EventStats {
    pub fn total(&self) -> u64 {
        self.primary + self.secondary + self.synced
    }

    fn bump(&mut self, source: EventSource) {
        match source {
            EventSource::Primary => self.primary += 1,
            EventSource::Secondary => self.secondary += 1,
            EventSource::Synced => self.synced += 1,
        }
    }
}

/// Most-recent-first ring of canonical events. The oldest entry is discarded once `capacity` is
/// exceeded; the counters keep growing.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    state: Mutex<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    entries: VecDeque<CanonicalEvent>,
    stats: EventStats,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(LogState {
                entries: VecDeque::with_capacity(capacity),
                stats: EventStats::default(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, event: CanonicalEvent) {
        let mut state = self.lock();
        state.stats.bump(event.source());
        state.entries.push_front(event);
        state.entries.truncate(self.capacity);
    }

    /// Retained events, most recent first.
    pub fn recent(&self) -> Vec<CanonicalEvent> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn stats(&self) -> EventStats {
        self.lock().stats
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
