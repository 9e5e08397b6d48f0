//! Durable key-value storage for visitor state
//!
//! The engine persists three entries (visitor id, assignment map, event log)
//! through this trait. Backends:
//! - [`MemoryKvStore`]: in-memory, lost on drop (tests, server-side rendering)
//! - [`FileKvStore`]: one JSON file standing in for a browser profile
//! - `LocalStorageKv` (wasm only): the browser's `localStorage`
//!
//! Access is synchronous, matching browser storage. Values are strings because
//! everything stored is JSON or an opaque id.
//!
//! # Example
//!
//! ```rust
//! use storefront_experiments::kv::{KvStore, MemoryKvStore};
//!
//! # fn example() -> storefront_experiments::Result<()> {
//! let store = MemoryKvStore::new();
//!
//! store.set("key", "value".to_string())?;
//! assert_eq!(store.get("key")?, Some("value".to_string()));
//!
//! store.delete("key")?;
//! assert!(!store.exists("key")?);
//! # Ok(())
//! # }
//! ```

mod file;
mod memory;

pub use file::FileKvStore;
pub use memory::MemoryKvStore;

use crate::Result;
use std::rc::Rc;
use std::sync::Arc;

/// Synchronous key-value store over string values.
///
/// Implementations are not required to be `Send`/`Sync`: the browser storage
/// handle is neither.
pub trait KvStore {
    /// Get a value by key.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value for a key.
    ///
    /// Overwrites any existing value.
    ///
    /// # Errors
    /// Returns error if the backing storage rejects the write (quota, denied)
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Delete a key.
    ///
    /// No-op if the key doesn't exist.
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be written
    fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists.
    ///
    /// # Errors
    /// Returns error if the backing storage cannot be read
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
}

impl<T: KvStore + ?Sized> KvStore for Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_kv_set_get() {
        let store = MemoryKvStore::new();

        store.set("key1", "value1".to_string()).unwrap();
        let value = store.get("key1").unwrap();

        assert_eq!(value, Some("value1".to_string()));
    }

    #[test]
    fn test_memory_kv_get_nonexistent() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_memory_kv_overwrite() {
        let store = MemoryKvStore::new();

        store.set("key", "value1".to_string()).unwrap();
        store.set("key", "value2".to_string()).unwrap();

        assert_eq!(store.get("key").unwrap(), Some("value2".to_string()));
    }

    #[test]
    fn test_memory_kv_delete() {
        let store = MemoryKvStore::new();

        store.set("key", "value".to_string()).unwrap();
        store.delete("key").unwrap();

        assert_eq!(store.get("key").unwrap(), None);
    }

    #[test]
    fn test_memory_kv_delete_nonexistent() {
        let store = MemoryKvStore::new();

        // Should not error
        store.delete("nonexistent").unwrap();
    }

    #[test]
    fn test_memory_kv_exists() {
        let store = MemoryKvStore::new();

        assert!(!store.exists("key").unwrap());

        store.set("key", "value".to_string()).unwrap();
        assert!(store.exists("key").unwrap());

        store.delete("key").unwrap();
        assert!(!store.exists("key").unwrap());
    }

    #[test]
    fn test_shared_handles_see_same_entries() {
        let store = Rc::new(MemoryKvStore::new());
        let writer = Rc::clone(&store);

        writer.set("shared", "yes".to_string()).unwrap();

        assert_eq!(store.get("shared").unwrap(), Some("yes".to_string()));
        assert_eq!((&*store).get("shared").unwrap(), Some("yes".to_string()));
    }

    #[test]
    fn test_arc_handle_delegates() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("a", "1".to_string()).unwrap();
        assert!(store.exists("a").unwrap());
    }

    #[test]
    fn test_memory_kv_empty_value() {
        let store = MemoryKvStore::new();

        store.set("key", String::new()).unwrap();
        assert_eq!(store.get("key").unwrap(), Some(String::new()));
    }
}
