//! Registry of coordinators by config entry.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::coordinator::RefreshCoordinator;

/// Maps config entry ids to their coordinators.
#[derive(Debug, Default)]
pub struct CoordinatorRegistry {
    entries: RwLock<IndexMap<String, Arc<RefreshCoordinator>>>,
}

impl CoordinatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coordinator under its entry id, replacing any previous one.
    pub fn insert(&self, coordinator: Arc<RefreshCoordinator>) -> Option<Arc<RefreshCoordinator>> {
        self.entries
            .write()
            .insert(coordinator.entry_id().to_string(), coordinator)
    }

    /// Removes the coordinator of an entry.
    pub fn remove(&self, entry_id: &str) -> Option<Arc<RefreshCoordinator>> {
        self.entries.write().shift_remove(entry_id)
    }

    /// Returns the coordinator of an entry.
    pub fn get(&self, entry_id: &str) -> Option<Arc<RefreshCoordinator>> {
        self.entries.read().get(entry_id).cloned()
    }

    /// Returns the first coordinator whose latest snapshot contains the account.
    pub fn by_account(&self, number: &str) -> Option<Arc<RefreshCoordinator>> {
        self.entries
            .read()
            .values()
            .find(|c| c.has_account(number))
            .cloned()
    }

    /// Returns all registered entry ids.
    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns all registered coordinators.
    pub fn coordinators(&self) -> Vec<Arc<RefreshCoordinator>> {
        self.entries.read().values().cloned().collect()
    }

    /// Returns the number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no entry is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
