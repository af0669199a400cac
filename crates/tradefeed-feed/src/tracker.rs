//! Tracker event buffers.
//!
//! Entries are the raw JSON elements of `tracker` frames, stored whether
//! or not they parse as a `TrackerEvent`. While the tracker panel is
//! hovered new entries go to a paused buffer so the list under the pointer
//! does not move. `resume` flushes them into the live buffer in arrival
//! order.

use crate::store::MessageLog;
use serde_json::Value;
use tracing::debug;
use tradefeed_core::TrackerEvent;

#[derive(Debug)]
pub struct TrackerStore {
    live: MessageLog<Value>,
    paused: MessageLog<Value>,
}

impl TrackerStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            live: MessageLog::new(capacity),
            paused: MessageLog::new(capacity),
        }
    }

    /// Store one raw entry: paused buffer when `hovered`, live otherwise.
    pub fn push(&self, raw: Value, hovered: bool) {
        if hovered {
            self.paused.push(raw);
        } else {
            self.live.push(raw);
        }
    }

    /// Move paused entries into the live buffer. Returns how many moved.
    pub fn resume(&self) -> usize {
        let pending = self.paused.drain();
        let moved = pending.len();
        self.live.extend(pending);
        if moved > 0 {
            debug!(moved, "Tracker resumed, paused events flushed");
        }
        moved
    }

    pub fn live(&self) -> Vec<Value> {
        self.live.snapshot()
    }

    pub fn paused(&self) -> Vec<Value> {
        self.paused.snapshot()
    }

    /// Live entries that parse as tracker events; others are skipped.
    pub fn live_events(&self) -> Vec<TrackerEvent> {
        self.live
            .snapshot()
            .into_iter()
            .filter_map(|raw| serde_json::from_value(raw).ok())
            .collect()
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    pub fn paused_len(&self) -> usize {
        self.paused.len()
    }
}
