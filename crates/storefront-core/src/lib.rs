//! # storefront-core
//!
//! Core abstractions shared by the storefront crates.
//!
//! This crate provides the foundational types used across all components:
//!
//! - **Error Types**: The shared error taxonomy and result alias
//! - **Durable Scalar Store**: The per-origin key/value medium, its memory
//!   and file backends, and the JSON adapter that recovers from failures
//! - **Origin Scoping**: Key namespacing so one medium can host many origins
//! - **Configuration**: `STOREFRONT_*` environment configuration
//! - **Observability**: Logging initialization, spans and metrics
//!
//! ## Crate Boundary
//!
//! `storefront-core` is the **only** crate allowed to define shared
//! primitives. The catalog and collection crates depend on it and never on
//! each other's internals.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_core::prelude::*;
//!
//! let medium = Arc::new(MemoryStore::new());
//! let store = DurableStore::new(medium);
//!
//! assert!(store.set("favorites", &vec![7, 12]));
//! assert_eq!(store.get::<Vec<u64>>("favorites"), Some(vec![7, 12]));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod durable;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod scoped;
pub mod storage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::StorefrontConfig;
    pub use crate::durable::{DurableStore, Lookup};
    pub use crate::error::{Error, Result};
    pub use crate::scoped::OriginScopedStore;
    pub use crate::storage::{FileStore, MemoryStore, ScalarStore, StorageEvent};
}

// Re-export key types at crate root for ergonomics
pub use config::StorefrontConfig;
pub use durable::{DurableStore, Lookup};
pub use error::{Error, Result};
pub use observability::{LogFormat, init_logging};
pub use scoped::{OriginScopedStore, validate_key};
pub use storage::{FileStore, MemoryStore, ScalarStore, StorageEvent};
