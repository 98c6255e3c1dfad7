//! JSON adapter over a [`ScalarStore`] with local failure recovery.
//!
//! [`DurableStore`] is what the collection layer talks to. It never returns
//! storage errors to its caller:
//! - Failed writes are logged and reported as `false`; in-memory state stays
//!   authoritative for the rest of the session
//! - Unreadable or malformed values read as "absent"
//!
//! Only the first failure of a degraded period is logged at `warn`; repeats
//! go to `debug` until a write succeeds again.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::error::Error;
use crate::metrics;
use crate::storage::{ScalarStore, StorageEvent};

/// Outcome of reading a key through [`DurableStore::lookup`].
#[derive(Debug)]
pub enum Lookup<T> {
    /// The key held a well-formed value.
    Found(T),
    /// The key is absent.
    Absent,
    /// The key held a value that failed to decode.
    Malformed(Error),
    /// The medium could not be read.
    Unavailable(Error),
}

impl<T> Lookup<T> {
    /// Collapses the lookup into "present or absent".
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// JSON key/value store that recovers from storage failures locally.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn ScalarStore>,
    degraded: Arc<AtomicBool>,
}

impl fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableStore")
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

impl DurableStore {
    /// Wraps a raw backend.
    #[must_use]
    pub fn new(backend: Arc<dyn ScalarStore>) -> Self {
        Self {
            backend,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true while the medium is rejecting operations.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Reads and decodes `key`, classifying every failure.
    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Absent,
            Err(e) => {
                self.record_failure("get", key, &e);
                return Lookup::Unavailable(e);
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Lookup::Found(value),
            Err(e) => {
                let err = Error::malformed(key, e.to_string());
                tracing::warn!(key, error = %err, "discarding malformed persisted state");
                metrics::record_state_reset(key);
                Lookup::Malformed(err)
            }
        }
    }

    /// Reads and decodes `key`; malformed or unreadable values are absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lookup(key).found()
    }

    /// Encodes and writes `value` under `key`.
    ///
    /// Returns whether the value reached the medium.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                let err = Error::Serialization {
                    message: e.to_string(),
                };
                tracing::error!(key, error = %err, "failed to encode value for storage");
                return false;
            }
        };

        match self.backend.set(key, &encoded) {
            Ok(()) => {
                self.record_success();
                true
            }
            Err(e) => {
                self.record_failure("set", key, &e);
                false
            }
        }
    }

    /// Removes `key`. Returns whether the removal reached the medium.
    pub fn remove(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => {
                self.record_success();
                true
            }
            Err(e) => {
                self.record_failure("remove", key, &e);
                false
            }
        }
    }

    /// Subscribes to change notifications from the underlying medium.
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        self.backend.subscribe()
    }

    fn record_failure(&self, op: &'static str, key: &str, error: &Error) {
        metrics::record_storage_failure(op);
        if self.degraded.swap(true, Ordering::Relaxed) {
            tracing::debug!(op, key, error = %error, "storage still unavailable");
        } else {
            tracing::warn!(
                op,
                key,
                error = %error,
                "storage unavailable; continuing with in-memory state"
            );
        }
    }

    fn record_success(&self) {
        if self.degraded.swap(false, Ordering::Relaxed) {
            tracing::info!("storage available again");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn durable() -> (MemoryStore, DurableStore) {
        let medium = MemoryStore::new();
        let store = DurableStore::new(Arc::new(medium.clone()));
        (medium, store)
    }

    #[test]
    fn test_set_then_get() {
        let (_, store) = durable();
        assert!(store.set("ids", &vec![1, 2, 3]));
        assert_eq!(store.get::<Vec<i64>>("ids"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_malformed_json_reads_as_absent() {
        let (medium, store) = durable();
        medium.set("ids", "{not json").expect("raw set");
        assert_eq!(store.get::<Vec<i64>>("ids"), None);
        assert!(matches!(
            store.lookup::<Vec<i64>>("ids"),
            Lookup::Malformed(Error::MalformedPersistedState { .. })
        ));
    }

    #[test]
    fn test_wrong_shape_reads_as_malformed() {
        let (medium, store) = durable();
        medium.set("ids", r#"{"id": 1}"#).expect("raw set");
        assert!(matches!(store.lookup::<Vec<i64>>("ids"), Lookup::Malformed(_)));
    }

    #[test]
    fn test_absent_key() {
        let (_, store) = durable();
        assert!(matches!(store.lookup::<Vec<i64>>("missing"), Lookup::Absent));
    }

    #[test]
    fn test_quota_failure_is_swallowed_and_recovers() {
        let store = DurableStore::new(Arc::new(MemoryStore::with_quota(12)));

        assert!(!store.set("ids", &vec![1_000_000, 2_000_000]));
        assert!(store.is_degraded());

        assert!(store.set("ids", &vec![1]));
        assert!(!store.is_degraded());
    }
}
