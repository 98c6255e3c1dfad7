//! Durable scalar storage: the per-origin key/value medium.
//!
//! This module defines the raw storage contract every backend implements.
//! The contract mirrors browser origin storage:
//! - Synchronous `get` / `set` / `remove` of string values
//! - Whole-value overwrites (no partial updates)
//! - Optional change notifications for other readers of the same medium
//!
//! JSON encoding and failure recovery live one layer up in
//! [`DurableStore`](crate::durable::DurableStore); backends report every
//! failure as an error and never swallow it.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::error::{Error, Result};

/// Capacity of the change-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification that a key changed in the backing medium.
///
/// The in-process analogue of the browser `storage` event: a writer on one
/// handle notifies every other handle sharing the medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// The key that changed, or `None` when the whole medium was cleared.
    pub key: Option<String>,
}

impl StorageEvent {
    /// Event for a single changed key.
    #[must_use]
    pub fn changed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    /// Event for a cleared medium.
    #[must_use]
    pub fn cleared() -> Self {
        Self { key: None }
    }

    /// Returns true if this event may have changed `key`.
    #[must_use]
    pub fn concerns(&self, key: &str) -> bool {
        self.key.as_deref().is_none_or(|k| k == key)
    }
}

/// Storage backend trait for the durable scalar medium.
///
/// All backends (memory, file, origin-scoped wrappers) implement this trait.
pub trait ScalarStore: Send + Sync + 'static {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the medium rejects the write
    /// (quota exceeded, disabled storage, I/O failure).
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`.
    ///
    /// Succeeds even if the key doesn't exist (idempotent).
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the medium cannot be written.
    fn remove(&self, key: &str) -> Result<()>;

    /// Subscribes to change notifications from other writers.
    ///
    /// Returns `None` for media that cannot observe foreign writes.
    fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        None
    }
}

/// In-memory storage medium.
///
/// Cloning yields another handle onto the same medium, which is how tests
/// model several tabs sharing one origin. Every handle sees every write and
/// receives a [`StorageEvent`] for it.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    events: broadcast::Sender<StorageEvent>,
    quota_bytes: Option<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            values: Arc::new(RwLock::new(HashMap::new())),
            events,
            quota_bytes: None,
        }
    }
}

impl MemoryStore {
    /// Creates a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory store that rejects writes once the summed size of
    /// keys and values would exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Removes every key and notifies subscribers.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the lock is poisoned.
    pub fn clear(&self) -> Result<()> {
        self.values.write().map_err(|_| poisoned())?.clear();
        let _ = self.events.send(StorageEvent::cleared());
        Ok(())
    }

    /// Returns all stored keys (for debugging and tests).
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values
            .read()
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn notify(&self, key: &str) {
        // No subscribers is a normal state.
        let _ = self.events.send(StorageEvent::changed(key));
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

impl ScalarStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;

        if let Some(quota) = self.quota_bytes {
            let used: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(Error::storage(format!(
                    "quota exceeded writing {key}: {needed} > {quota} bytes"
                )));
            }
        }

        values.insert(key.to_string(), value.to_string());
        drop(values);
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self
            .values
            .write()
            .map_err(|_| poisoned())?
            .remove(key)
            .is_some();
        if removed {
            self.notify(key);
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        Some(self.events.subscribe())
    }
}

/// File-backed storage medium.
///
/// Each key is stored as one file under the root directory. Writes go to a
/// temporary sibling first and are renamed into place, so readers never
/// observe a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a file store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::storage_with_source(format!("create {}", root.display()), e)
        })?;
        Ok(Self { root })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

/// Maps a storage key onto a single flat file name.
///
/// Bytes outside `[A-Za-z0-9._=-]` are percent-encoded so keys containing
/// `/` cannot escape the root directory.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'=' | b'-') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl ScalarStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage_with_source(format!("read {key}"), e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::storage_with_source(format!("write {key}"), e)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_with_source(format!("remove {key}"), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("cart", "[]").expect("set should succeed");
        assert_eq!(store.get("cart").expect("get"), Some("[]".to_string()));
    }

    #[test]
    fn test_memory_store_missing_key_is_absent() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").expect("get"), None);
    }

    #[test]
    fn test_memory_store_remove_is_idempotent() {
        let store = MemoryStore::new();
        store.set("k", "v").expect("set");
        store.remove("k").expect("remove");
        store.remove("k").expect("second remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn test_memory_store_clones_share_medium() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.clone();
        tab_a.set("favorites", "[]").expect("set");
        assert_eq!(tab_b.get("favorites").expect("get"), Some("[]".into()));
    }

    #[test]
    fn test_memory_store_notifies_subscribers() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.clone();
        let mut events = tab_b.subscribe().expect("memory store supports events");

        tab_a.set("compare", "[]").expect("set");
        tab_a.clear().expect("clear");

        assert_eq!(events.try_recv().expect("event"), StorageEvent::changed("compare"));
        assert_eq!(events.try_recv().expect("event"), StorageEvent::cleared());
    }

    #[test]
    fn test_memory_store_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(16);
        store.set("cart", "[1,2]").expect("fits");
        let err = store.set("cart", "[1,2,3,4,5,6,7,8,9]").unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        // Rejected write leaves the previous value in place
        assert_eq!(store.get("cart").expect("get"), Some("[1,2]".into()));
    }

    #[test]
    fn test_storage_event_concerns() {
        assert!(StorageEvent::changed("cart").concerns("cart"));
        assert!(!StorageEvent::changed("cart").concerns("compare"));
        assert!(StorageEvent::cleared().concerns("anything"));
    }

    #[test]
    fn test_file_store_roundtrip_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");

        store.set("origin=shop/cart", r#"[{"id":1}]"#).expect("set");
        assert_eq!(
            store.get("origin=shop/cart").expect("get"),
            Some(r#"[{"id":1}]"#.to_string())
        );

        store.remove("origin=shop/cart").expect("remove");
        assert_eq!(store.get("origin=shop/cart").expect("get"), None);
        store.remove("origin=shop/cart").expect("remove is idempotent");
    }

    #[test]
    fn test_file_store_keys_stay_inside_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).expect("open");
        store.set("../escape", "x").expect("set");

        let entries: Vec<_> = fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].to_string_lossy(), "..%2Fescape.json");
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        FileStore::open(dir.path())
            .expect("open")
            .set("compare", "[]")
            .expect("set");

        let reopened = FileStore::open(dir.path()).expect("reopen");
        assert_eq!(reopened.get("compare").expect("get"), Some("[]".into()));
    }
}
