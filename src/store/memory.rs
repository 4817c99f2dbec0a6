//! In-memory mirror of the browser's localStorage.
//!
//! The bridge hydrates it once per page load and drains `take_pending`
//! after each request to flush writes back to localStorage.

use serde::Serialize;
use std::collections::BTreeMap;

use super::KvStore;

/// One write the bridge still has to apply to localStorage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingWrite {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    pending: Vec<PendingWrite>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry with `entries`. Hydration is not journalled.
    pub fn hydrate<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.entries = entries.into_iter().collect();
        self.pending.clear();
    }

    /// Drain the write journal. Repeated writes to one key collapse to the
    /// last value, in first-write order.
    pub fn take_pending(&mut self) -> Vec<PendingWrite> {
        let mut out: Vec<PendingWrite> = Vec::with_capacity(self.pending.len());
        for write in self.pending.drain(..) {
            match out.iter_mut().find(|w| w.key == write.key) {
                Some(existing) => existing.value = write.value,
                None => out.push(write),
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.pending.push(PendingWrite {
            key: key.to_string(),
            value: value.clone(),
        });
        self.entries.insert(key.to_string(), value);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
