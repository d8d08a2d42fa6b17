//! Bounded in-memory event log.
//!
//! Entries are created on receipt and never mutated. The whole log is
//! evicted only by a snapshot replacement on reconnect-with-init; beyond
//! that, the oldest entries fall off once the capacity cap is reached.

use std::collections::VecDeque;

use crate::event::MonitorEvent;

/// Default cap on retained events. Oldest entries are evicted first.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct EventStore {
    events: VecDeque<MonitorEvent>,
    capacity: usize,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Clear the log and load an authoritative snapshot batch.
    ///
    /// Batches larger than the capacity keep their newest (trailing)
    /// events.
    pub fn replace_snapshot(&mut self, batch: Vec<MonitorEvent>) {
        self.events.clear();
        let skip = batch.len().saturating_sub(self.capacity);
        self.events.extend(batch.into_iter().skip(skip));
    }

    /// Append one live event, preserving arrival order for display.
    pub fn append(&mut self, event: MonitorEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Events in arrival order (display order).
    pub fn iter_arrival(&self) -> impl Iterator<Item = &MonitorEvent> {
        self.events.iter()
    }

    /// Timestamp-ascending view for the projector. The sort is stable, so
    /// equal timestamps keep their arrival order. Live delivery is not
    /// guaranteed timestamp-monotonic across reconnects, and the projector
    /// must never depend on display order.
    pub fn by_timestamp(&self) -> Vec<&MonitorEvent> {
        let mut view: Vec<&MonitorEvent> = self.events.iter().collect();
        view.sort_by_key(|e| e.timestamp);
        view
    }

    /// Largest timestamp currently in the log. Used to detect out-of-order
    /// live arrivals.
    pub fn newest_timestamp(&self) -> Option<i64> {
        self.events.iter().map(|e| e.timestamp).max()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
