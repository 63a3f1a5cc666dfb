//! Application registry.
//!
//! Tracks the loaded application instances of one loader, keyed by
//! instance id. The registry is an ordinary value: embedders that want
//! several independent hosts in one process create one registry each.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use helium_core::error::{ApplicationError, Result};
use helium_core::id::AppInstanceId;

use crate::handle::ApplicationHandle;

/// Registry of loaded application instances
#[derive(Default)]
pub struct ApplicationRegistry {
    /// Map of instance id to handle
    handles: DashMap<AppInstanceId, Arc<ApplicationHandle>>,
}

impl ApplicationRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under its instance id.
    ///
    /// Fails with `DuplicateInstance` if the id is taken; the check and the
    /// insert are one atomic step.
    pub fn register(&self, handle: Arc<ApplicationHandle>) -> Result<()> {
        let id = handle.app_instance_id().clone();

        match self.handles.entry(id.clone()) {
            Entry::Occupied(_) => Err(ApplicationError::DuplicateInstance(id).into()),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                debug!(instance = %id, "Registered application instance");
                Ok(())
            }
        }
    }

    /// Remove a handle, returning it if it was registered
    pub fn unregister(&self, id: &AppInstanceId) -> Option<Arc<ApplicationHandle>> {
        let removed = self.handles.remove(id).map(|(_, handle)| handle);
        if removed.is_some() {
            debug!(instance = %id, "Unregistered application instance");
        }
        removed
    }

    /// Get a handle by instance id
    pub fn get(&self, id: &AppInstanceId) -> Option<Arc<ApplicationHandle>> {
        self.handles.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if an instance id is registered
    pub fn contains(&self, id: &AppInstanceId) -> bool {
        self.handles.contains_key(id)
    }

    /// Registered instance ids, sorted
    pub fn ids(&self) -> Vec<AppInstanceId> {
        let mut ids: Vec<_> = self.handles.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl std::fmt::Debug for ApplicationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationRegistry")
            .field("instances", &self.ids())
            .finish()
    }
}
