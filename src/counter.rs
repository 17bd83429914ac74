use crate::identity::ResourceTypeIdentity;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// namespace -> count, for one resource type
pub type NamespaceCounts = HashMap<String, i64>;

/// Point-in-time copy of a [`CounterStore`]
pub type Snapshot = HashMap<ResourceTypeIdentity, NamespaceCounts>;

/// Live object counts keyed by (resource type, namespace).
///
/// Counts are `adds - deletes` and are not clamped: a delete observed
/// before the matching add leaves the entry negative. Entries are never
/// removed.
#[derive(Debug, Default)]
pub struct CounterStore {
    counts: Mutex<Snapshot>,
}

impl CounterStore {
    pub fn new() -> Self {
        CounterStore::default()
    }

    fn counts(&self) -> MutexGuard<'_, Snapshot> {
        // a panic while holding the lock cannot leave a half-applied update
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, identity: &ResourceTypeIdentity, namespace: &str, delta: i64) {
        let mut counts = self.counts();
        if !counts.contains_key(identity) {
            counts.insert(identity.clone(), NamespaceCounts::new());
        }
        if let Some(by_ns) = counts.get_mut(identity) {
            *by_ns.entry(namespace.to_string()).or_default() += delta;
        }
    }

    pub fn increment(&self, identity: &ResourceTypeIdentity, namespace: &str) {
        self.apply(identity, namespace, 1)
    }

    pub fn decrement(&self, identity: &ResourceTypeIdentity, namespace: &str) {
        self.apply(identity, namespace, -1)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.counts().clone()
    }
}
