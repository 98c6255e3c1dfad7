//! Error types and result aliases for the storefront.
//!
//! This module defines the shared error taxonomy used across all storefront
//! components. Storage and decoding failures are recovered locally by the
//! collection layer; query and repository failures are surfaced to callers.

use std::fmt;

/// The result type used throughout the storefront.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in storefront operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing storage medium could not be read or written.
    ///
    /// Covers quota exhaustion, disabled storage and I/O failures.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A persisted document failed to parse or failed the shape check.
    #[error("malformed persisted state under {key}: {message}")]
    MalformedPersistedState {
        /// Storage key holding the document.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// A catalog query violated the request contract.
    #[error("invalid query request: {0}")]
    InvalidQueryRequest(String),

    /// The product repository could not supply products.
    #[error("repository unavailable: {message}")]
    RepositoryUnavailable {
        /// Description of the repository failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value could not be serialized.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided (configuration, identifiers).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new malformed-state error for the given key.
    #[must_use]
    pub fn malformed(key: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::MalformedPersistedState {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Creates a new repository error with the given message.
    #[must_use]
    pub fn repository(message: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new repository error with a source cause.
    #[must_use]
    pub fn repository_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RepositoryUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true when the error indicates a bug in the caller rather
    /// than an environmental condition.
    ///
    /// The UI shows "could not load" for environmental failures and treats
    /// contract violations as programming errors.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::InvalidQueryRequest(_) | Self::InvalidInput(_))
    }
}
