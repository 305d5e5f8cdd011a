//! Resource handle registry
//!
//! Remote controllers refer to engine objects by small positive integers
//! rather than engine-internal identifiers. `HandleMap` assigns those
//! handles lazily: the first time an object is referenced by a command or
//! an event it receives the next value of a monotonically increasing
//! counter, and keeps it for as long as the object lives. Handles are
//! never reused within a process lifetime.
//!
//! One instance exists per object category (calls, proxies); standalone
//! audio streams use their own table in the daemon core because their
//! entries carry per-stream state beyond the handle.

use std::collections::HashMap;
use std::hash::Hash;

/// Mapping from engine object identity to a stable controller handle.
#[derive(Debug)]
pub struct HandleMap<K> {
    next: u32,
    by_key: HashMap<K, u32>,
}

impl<K: Eq + Hash + Copy> HandleMap<K> {
    /// An empty map; the first assigned handle is 1.
    pub fn new() -> Self {
        Self {
            next: 1,
            by_key: HashMap::new(),
        }
    }

    /// The handle for `key`, assigning the next counter value on first
    /// reference. Stable across repeated calls.
    pub fn handle_of(&mut self, key: K) -> u32 {
        if let Some(&handle) = self.by_key.get(&key) {
            return handle;
        }
        let handle = self.next;
        self.next += 1;
        self.by_key.insert(key, handle);
        handle
    }

    /// The handle for `key`, if one was already assigned.
    pub fn handle(&self, key: &K) -> Option<u32> {
        self.by_key.get(key).copied()
    }

    /// Drop entries whose key no longer appears in the live-object list.
    ///
    /// Counters keep advancing, so a pruned object's handle is never
    /// handed out again.
    pub fn prune(&mut self, live: &[K]) {
        self.by_key.retain(|k, _| live.contains(k));
    }

    /// Number of currently mapped objects.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }
}

impl<K: Eq + Hash + Copy> Default for HandleMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
