//! In-process path → listener table.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, PoisonError, RwLock};

use crate::listener::ResourceListener;
use crate::ports::Servient;

/// Shared table of listeners keyed by path.
///
/// Cloning is cheap and every clone sees the same table, so one clone can be
/// handed to the Things that register listeners while another serves lookups
/// from a transport binding.
#[derive(Debug, Clone, Default)]
pub struct ListenerTable {
    listeners: Arc<RwLock<HashMap<String, ResourceListener>>>,
}

impl ListenerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The listener bound at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<ResourceListener> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// All bound paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Servient for ListenerTable {
    fn add_listener(&self, path: &str, listener: ResourceListener) {
        tracing::debug!(path, kind = listener.kind(), "listener registered");
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), listener);
    }

    fn bind_vacant(&self, path: &str, listener: ResourceListener) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match listeners.entry(path.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!(path, "path already bound");
                false
            }
            Entry::Vacant(entry) => {
                tracing::debug!(path, kind = listener.kind(), "listener registered");
                entry.insert(listener);
                true
            }
        }
    }

    fn remove_listener(&self, path: &str) -> Option<ResourceListener> {
        let removed = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        if removed.is_some() {
            tracing::debug!(path, "listener unregistered");
        }
        removed
    }
}
