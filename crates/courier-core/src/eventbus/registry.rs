//! Concurrent address-to-consumers registry with round-robin selection.
//!
//! Each address maps to the consumers registered there (in registration order)
//! plus a rotation cursor. The map entry's lock is the structural lock for that
//! address: registration, removal and selection for one address never
//! interleave. Handlers are never invoked while an entry is locked.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::consumer::Consumer;

/// Consumers registered at one address.
#[derive(Default)]
struct AddressEntry {
    consumers: Vec<Arc<Consumer>>,
    /// Index of the consumer the next send selects.
    cursor: usize,
}

/// Registry of consumers keyed by address.
///
/// User address entries are not pruned when their last consumer leaves; an
/// empty entry behaves exactly like an unknown address. Reply addresses are
/// never reused, so the bus drops their entries with
/// [`remove_if_empty`](Self::remove_if_empty) once the reply window closes.
#[derive(Default)]
pub struct ConsumerRegistry {
    entries: DashMap<String, AddressEntry>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a consumer to its address, creating the entry if needed.
    pub fn register(&self, consumer: Arc<Consumer>) {
        self.entries
            .entry(consumer.address().to_string())
            .or_default()
            .consumers
            .push(consumer);
    }

    /// Remove a consumer by identity.
    ///
    /// Returns `true` if it was registered. Removing an absent consumer is a
    /// no-op.
    pub fn unregister(&self, address: &str, consumer_id: Uuid) -> bool {
        let Some(mut entry) = self.entries.get_mut(address) else {
            return false;
        };

        let Some(index) = entry.consumers.iter().position(|c| c.id() == consumer_id) else {
            return false;
        };

        entry.consumers.remove(index);
        // Keep the rotation pointing at the same next consumer.
        if index < entry.cursor {
            entry.cursor -= 1;
        }
        if entry.cursor >= entry.consumers.len() {
            entry.cursor = 0;
        }
        true
    }

    /// Drop the address entry if no consumer is left in it.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_if_empty(&self, address: &str) -> bool {
        self.entries
            .remove_if(address, |_, entry| entry.consumers.is_empty())
            .is_some()
    }

    /// Pick one consumer for a point-to-point send, advancing the rotation.
    pub fn select_for_send(&self, address: &str) -> Option<Arc<Consumer>> {
        let mut entry = self.entries.get_mut(address)?;
        let len = entry.consumers.len();
        if len == 0 {
            return None;
        }

        let index = entry.cursor % len;
        entry.cursor = (index + 1) % len;
        Some(Arc::clone(&entry.consumers[index]))
    }

    /// Snapshot every consumer at an address for a publish.
    pub fn select_for_publish(&self, address: &str) -> Vec<Arc<Consumer>> {
        self.entries
            .get(address)
            .map(|entry| entry.consumers.clone())
            .unwrap_or_default()
    }

    /// Number of consumers currently registered at an address.
    pub fn consumer_count(&self, address: &str) -> usize {
        self.entries
            .get(address)
            .map(|entry| entry.consumers.len())
            .unwrap_or(0)
    }

    /// Number of address entries held, including emptied user addresses.
    pub fn address_count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, address: &str, consumer_id: Uuid) -> bool {
        self.entries
            .get(address)
            .is_some_and(|entry| entry.consumers.iter().any(|c| c.id() == consumer_id))
    }
}

impl std::fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("addresses", &self.entries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
