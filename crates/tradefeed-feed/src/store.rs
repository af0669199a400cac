//! Generic store contracts.
//!
//! `SnapshotStore` holds the latest value and is replaced wholesale.
//! `MessageLog` appends and evicts the oldest entry once full.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Latest-value store.
#[derive(Debug)]
pub struct SnapshotStore<T> {
    value: RwLock<Option<T>>,
    updated_at: RwLock<Option<DateTime<Utc>>>,
    /// Incremented on every replace.
    version: AtomicU64,
}

impl<T> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self {
            value: RwLock::new(None),
            updated_at: RwLock::new(None),
            version: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> SnapshotStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot.
    pub fn replace(&self, value: T) {
        *self.value.write() = Some(value);
        *self.updated_at.write() = Some(Utc::now());
        self.version.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Read the snapshot without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.value.read().as_ref())
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        *self.updated_at.read()
    }

    pub fn clear(&self) {
        *self.value.write() = None;
    }
}

/// Bounded append-only log, oldest first.
#[derive(Debug)]
pub struct MessageLog<T> {
    entries: RwLock<VecDeque<T>>,
    capacity: usize,
    /// Total appended, including evicted entries.
    appended: AtomicU64,
}

impl<T: Clone> MessageLog<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            appended: AtomicU64::new(0),
        }
    }

    /// Append one entry, evicting the oldest when full.
    pub fn push(&self, entry: T) {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        self.appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn extend(&self, batch: impl IntoIterator<Item = T>) {
        for entry in batch {
            self.push(entry);
        }
    }

    /// All entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.read().iter().cloned().collect()
    }

    /// Up to `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        self.entries.read().iter().rev().take(n).cloned().collect()
    }

    pub fn latest(&self) -> Option<T> {
        self.entries.read().back().cloned()
    }

    /// Remove and return everything, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.entries.write().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
