//! Assignment Store - durable experiment → variant map for one visitor

use tracing::{debug, warn};

use super::AssignmentMap;
use crate::kv::KvStore;
use crate::Result;

/// Durable per-visitor assignments.
///
/// The map is read once at construction and cached; every [`set`](Self::set)
/// rewrites the whole pair list. Unreadable or corrupt storage yields an empty
/// map and a warning; failed writes are logged and the cached value stays
/// authoritative for the page.
#[derive(Debug)]
pub struct AssignmentStore<S> {
    store: S,
    key: String,
    assignments: AssignmentMap,
}

impl<S: KvStore> AssignmentStore<S> {
    /// Open the store, loading any persisted assignments.
    pub fn open(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let assignments = Self::load_or_empty(&store, &key);
        Self {
            store,
            key,
            assignments,
        }
    }

    /// Read the persisted map without caching it (reporting read path).
    ///
    /// # Errors
    /// Returns error if storage cannot be read or holds malformed JSON
    pub fn read(store: &S, key: &str) -> Result<AssignmentMap> {
        match store.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(AssignmentMap::new()),
        }
    }

    fn load_or_empty(store: &S, key: &str) -> AssignmentMap {
        Self::read(store, key).unwrap_or_else(|e| {
            warn!(error = %e, key, "Failed to load assigned variants");
            AssignmentMap::new()
        })
    }

    /// Previously persisted variant for an experiment.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<&str> {
        self.assignments.get(experiment_id)
    }

    /// Persist a pairing, overwriting any earlier value.
    pub fn set(&mut self, experiment_id: &str, variant_id: &str) {
        self.assignments.insert(experiment_id, variant_id);
        if let Err(e) = self.persist() {
            warn!(error = %e, experiment_id, "Failed to save assigned variants");
        } else {
            debug!(experiment_id, variant_id, "Assignment persisted");
        }
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.assignments)?;
        self.store.set(&self.key, raw)
    }

    /// Snapshot of all assignments.
    #[must_use]
    pub fn all(&self) -> AssignmentMap {
        self.assignments.clone()
    }

    /// Borrow the cached assignments.
    #[must_use]
    pub const fn assignments(&self) -> &AssignmentMap {
        &self.assignments
    }

    /// Re-read storage, picking up writes from other sessions.
    pub fn reload(&mut self) {
        self.assignments = Self::load_or_empty(&self.store, &self.key);
    }

    /// Backing key-value store.
    #[must_use]
    pub const fn backend(&self) -> &S {
        &self.store
    }
}
