//! In-memory KV store implementation using `DashMap`.
//!
//! Data is lost when the store is dropped. Tests use it as a fresh browser
//! profile; sharing one instance across engines models a reload.

use super::KvStore;
use crate::Result;
use dashmap::DashMap;

/// In-memory key-value store.
///
/// # Example
///
/// ```rust
/// use storefront_experiments::kv::{KvStore, MemoryKvStore};
///
/// # fn example() -> storefront_experiments::Result<()> {
/// let store = MemoryKvStore::new();
/// store.set("hello", "world".to_string())?;
/// assert_eq!(store.get("hello")?, Some("world".to_string()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryKvStore {
    store: DashMap<String, String>,
}

impl MemoryKvStore {
    /// Create a new in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Get the number of entries in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Clear all entries (the equivalent of clearing site data).
    pub fn clear(&self) {
        self.store.clear();
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.store.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(key))
    }
}
