//! Shared test utilities for storefront integration tests.
//!
//! This crate provides:
//! - [`TracingStore`]: In-memory scalar storage with operation recording
//!   and failure injection
//! - [`TestContext`]: Pre-configured origin, configuration and medium
//! - [`ProductFactory`]: Catalog fixtures with sensible defaults
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_test_utils::{ProductFactory, TestContext};
//!
//! #[test]
//! fn test_example() {
//!     let ctx = TestContext::new();
//!     let mut session = ctx.session();
//!     session.cart_mut().add_to_cart(&ProductFactory::tractor(1, 50_000));
//!     // ... assert ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod storage;

pub use assertions::*;
pub use fixtures::*;
pub use storage::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("storefront=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
