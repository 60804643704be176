//! Registry of flows whose fragment directory currently exists.

use std::time::SystemTime;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::ConnectionId;

/// Concurrent map from flow to the time its first fragment was seen.
///
/// Operations on one identifier are atomic with respect to each other;
/// different identifiers live in different shards and do not contend.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: DashMap<ConnectionId, SystemTime>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.flows.contains_key(id)
    }

    /// Records `id` as open. Returns `true` only for the caller that
    /// actually inserted the entry.
    pub fn register(&self, id: ConnectionId) -> bool {
        self.register_at(id, SystemTime::now())
    }

    pub fn register_at(&self, id: ConnectionId, first_seen: SystemTime) -> bool {
        match self.flows.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(first_seen);
                true
            }
        }
    }

    /// Removes `id`, returning when it was first seen.
    pub fn remove(&self, id: &ConnectionId) -> Option<SystemTime> {
        self.flows.remove(id).map(|(_, first_seen)| first_seen)
    }

    pub fn first_seen(&self, id: &ConnectionId) -> Option<SystemTime> {
        self.flows.get(id).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
