//! File-backed KV store: a single JSON object on disk.
//!
//! Stands in for a browser profile on native targets (demo binary, report
//! tooling). Every operation re-reads the file so two stores pointed at the
//! same path behave like two tabs sharing `localStorage`: last writer wins.

use super::KvStore;
use crate::{Error, Result};
use tracing::warn;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON-file key-value store.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    path: PathBuf,
}

impl FileKvStore {
    /// Open (or lazily create) a store at `path`.
    ///
    /// The file is only created on the first write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Entries to build a write on: an unparseable file is replaced.
    fn entries_for_write(&self) -> Result<BTreeMap<String, String>> {
        match self.read_entries() {
            Err(Error::Serialization(e)) => {
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Profile file unreadable, starting a fresh one"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)?;

        // Write-then-rename so a crash never leaves a half-written profile
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            Error::StorageError(format!(
                "Failed to replace {}: {e}",
                self.path.display()
            ))
        })
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries_for_write()?;
        entries.insert(key.to_string(), value);
        self.write_entries(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries_for_write()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kv_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("profile.json"));

        assert_eq!(store.get("anything").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_kv_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        FileKvStore::open(&path)
            .set("visitor", "user_abc".to_string())
            .unwrap();

        let reopened = FileKvStore::open(&path);
        assert_eq!(reopened.get("visitor").unwrap(), Some("user_abc".to_string()));
    }

    #[test]
    fn test_file_kv_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("profile.json"));

        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();
        store.delete("a").unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_file_kv_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileKvStore::open(&path);
        assert!(matches!(store.get("a"), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_file_kv_write_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{not json").unwrap();
        let store = FileKvStore::open(&path);

        store.set("visitor", "user_abc".to_string()).unwrap();

        assert_eq!(store.get("visitor").unwrap(), Some("user_abc".to_string()));
        assert_eq!(
            FileKvStore::open(&path).get("visitor").unwrap(),
            Some("user_abc".to_string())
        );
    }
}
