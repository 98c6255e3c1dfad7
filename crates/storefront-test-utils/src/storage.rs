//! Test storage with operation tracing and failure injection.
//!
//! [`TracingStore`] wraps a [`MemoryStore`] and records every operation for
//! assertions. Failures can be injected per key prefix, for the next write
//! to one key, or for the whole medium.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use storefront_core::error::{Error, Result};
use storefront_core::{MemoryStore, ScalarStore, StorageEvent};
use tokio::sync::broadcast;

/// Record of a storage operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Read.
    Get {
        /// Key that was read.
        key: String,
    },
    /// Write.
    Set {
        /// Key that was written.
        key: String,
        /// Size of the value written.
        size: usize,
    },
    /// Removal.
    Remove {
        /// Key that was removed.
        key: String,
    },
}

impl StorageOp {
    /// Key the operation touched.
    pub fn key(&self) -> &str {
        match self {
            Self::Get { key } | Self::Set { key, .. } | Self::Remove { key } => key,
        }
    }
}

/// In-memory scalar store with operation tracing.
///
/// Clones share the medium, the log and the injected failures.
#[derive(Debug, Clone, Default)]
pub struct TracingStore {
    inner: MemoryStore,
    operations: Arc<Mutex<Vec<StorageOp>>>,
    fail_prefixes: Arc<Mutex<Vec<String>>>,
    fail_next_write: Arc<Mutex<HashSet<String>>>,
    fail_all: Arc<AtomicBool>,
}

impl TracingStore {
    /// Creates a new empty tracing store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying medium, for seeding values without tracing.
    pub fn medium(&self) -> &MemoryStore {
        &self.inner
    }

    /// Returns all recorded operations.
    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Number of successful writes to `key`.
    pub fn writes_to(&self, key: &str) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, StorageOp::Set { key: k, .. } if k == key))
            .count()
    }

    /// Fails every operation on keys starting with `prefix`.
    pub fn inject_failure(&self, prefix: impl Into<String>) {
        self.fail_prefixes.lock().expect("lock").push(prefix.into());
    }

    /// Fails the next write to exactly `key` (single-shot).
    pub fn fail_next_write(&self, key: impl Into<String>) {
        self.fail_next_write.lock().expect("lock").insert(key.into());
    }

    /// Fails every operation until [`clear_failures`](Self::clear_failures).
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_prefixes.lock().expect("lock").clear();
        self.fail_next_write.lock().expect("lock").clear();
        self.fail_all.store(false, Ordering::SeqCst);
    }

    /// Decoded JSON stored under `key`, bypassing tracing.
    pub fn json(&self, key: &str) -> Option<serde_json::Value> {
        let raw = self.inner.get(key).expect("memory get")?;
        Some(serde_json::from_str(&raw).expect("stored value is JSON"))
    }

    fn record(&self, op: StorageOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, key: &str) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Error::storage(format!("injected failure for key: {key}")));
        }
        let fail_prefixes = self.fail_prefixes.lock().expect("lock");
        if fail_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(Error::storage(format!("injected failure for key: {key}")));
        }
        Ok(())
    }

    fn check_write_failure(&self, key: &str) -> Result<()> {
        self.check_failure(key)?;
        if self.fail_next_write.lock().expect("lock").remove(key) {
            return Err(Error::storage(format!("injected write failure for key: {key}")));
        }
        Ok(())
    }
}

impl ScalarStore for TracingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_failure(key)?;
        self.record(StorageOp::Get {
            key: key.to_string(),
        });
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_write_failure(key)?;
        self.record(StorageOp::Set {
            key: key.to_string(),
            size: value.len(),
        });
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_write_failure(key)?;
        self.record(StorageOp::Remove {
            key: key.to_string(),
        });
        self.inner.remove(key)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        self.inner.subscribe()
    }
}
