//! Origin-scoped storage with a fixed key layout.
//!
//! A single medium can host several origins (shops, test sessions). Every
//! key written through [`OriginScopedStore`] is prefixed with
//! `origin={origin}/`, so collections of different origins never collide.
//!
//! # Security
//!
//! - Origin ids are validated at construction
//! - Keys containing `..` or path separators are rejected

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::storage::{ScalarStore, StorageEvent};

/// Origin-scoped wrapper around a shared medium.
#[derive(Clone)]
pub struct OriginScopedStore {
    backend: Arc<dyn ScalarStore>,
    origin: String,
    prefix: String,
}

impl std::fmt::Debug for OriginScopedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginScopedStore")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl OriginScopedStore {
    /// Creates a new origin-scoped wrapper.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `origin` is empty, contains path
    /// separators or control characters, or is not lowercase ASCII
    /// alphanumeric plus `-`, `_` and `.`.
    pub fn new(backend: Arc<dyn ScalarStore>, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        validate_origin(&origin)?;
        let prefix = format!("origin={origin}/");
        Ok(Self {
            backend,
            origin,
            prefix,
        })
    }

    /// Returns the origin id.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the fully-qualified key for a relative key.
    #[must_use]
    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn resolve(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        Ok(self.scoped_key(key))
    }

    /// Maps an event from the shared medium into this origin's key space.
    ///
    /// Returns `None` for events belonging to other origins.
    #[must_use]
    pub fn localize(&self, event: &StorageEvent) -> Option<StorageEvent> {
        match &event.key {
            None => Some(StorageEvent::cleared()),
            Some(key) => key
                .strip_prefix(&self.prefix)
                .map(StorageEvent::changed),
        }
    }
}

/// Checks that `key` is usable as a relative key under an origin.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if `key` is empty or contains `..` or a
/// path separator.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidInput("storage key cannot be empty".into()));
    }
    if key.contains("..") || key.contains('/') || key.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "storage key cannot contain path segments: {key}"
        )));
    }
    Ok(())
}

fn validate_origin(origin: &str) -> Result<()> {
    if origin.is_empty() {
        return Err(Error::InvalidInput("origin cannot be empty".into()));
    }
    if origin.contains('/') || origin.contains('\\') {
        return Err(Error::InvalidInput(
            "origin cannot contain path separators".into(),
        ));
    }
    if origin.chars().any(char::is_control) {
        return Err(Error::InvalidInput(
            "origin cannot contain control characters".into(),
        ));
    }
    if origin == "." || origin == ".." {
        return Err(Error::InvalidInput(format!("invalid origin: {origin}")));
    }
    if !origin
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::InvalidInput(format!(
            "origin must be lowercase alphanumeric with '-', '_' or '.': {origin}"
        )));
    }
    Ok(())
}

impl ScalarStore for OriginScopedStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.backend.get(&self.resolve(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(&self.resolve(key)?, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(&self.resolve(key)?)
    }

    /// Events are delivered in the backend's key space; pass them through
    /// [`OriginScopedStore::localize`] before matching against local keys.
    fn subscribe(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        self.backend.subscribe()
    }
}
