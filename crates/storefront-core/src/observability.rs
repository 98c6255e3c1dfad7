//! Observability infrastructure for the storefront.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors shared by the collection
//! and catalog crates.

use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::Error;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(Error::InvalidInput(format!(
                "unknown log format {other:?} (expected json or pretty)"
            ))),
        }
    }
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `storefront_collections=debug`)
///
/// # Example
///
/// ```rust
/// use storefront_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);
        // Another subscriber may already be installed by the host application.
        let _ = match format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        };
    });
}

/// Creates a span for collection operations with standard fields.
///
/// # Example
///
/// ```rust
/// use storefront_core::observability::collection_span;
///
/// let span = collection_span("upsert", "cart");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn collection_span(operation: &str, collection: &str) -> Span {
    tracing::debug_span!("collection", op = operation, collection = collection)
}

/// Creates a span for catalog query execution.
#[must_use]
pub fn catalog_span(operation: &str, sort: &str) -> Span {
    tracing::info_span!("catalog", op = operation, sort = sort)
}
