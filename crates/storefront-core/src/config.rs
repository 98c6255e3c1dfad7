//! Storefront configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::observability::LogFormat;
use crate::scoped::validate_key;

/// Default number of entries kept in the comparison list.
pub const DEFAULT_COMPARE_CAPACITY: usize = 4;

/// Default catalog page size.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Largest page size a caller may request.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Longest accepted search term, in characters.
pub const DEFAULT_MAX_SEARCH_LEN: usize = 100;

/// Configuration for a storefront session and its catalog queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Origin id used to scope storage keys.
    pub origin: String,

    /// Storage key of the cart collection.
    pub cart_key: String,

    /// Storage key of the favorites collection.
    pub favorites_key: String,

    /// Storage key of the comparison collection.
    pub compare_key: String,

    /// Number of products the comparison list holds before evicting.
    pub compare_capacity: usize,

    /// Page size used when the caller doesn't pick one.
    pub default_page_size: usize,

    /// Largest page size accepted by the query engine.
    pub max_page_size: usize,

    /// Longest accepted search term, in characters.
    pub max_search_len: usize,

    /// Directory for the file-backed store. `None` keeps state in memory.
    pub storage_dir: Option<PathBuf>,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            origin: "default".to_string(),
            cart_key: "cart".to_string(),
            favorites_key: "favorites".to_string(),
            compare_key: "compare".to_string(),
            compare_capacity: DEFAULT_COMPARE_CAPACITY,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_search_len: DEFAULT_MAX_SEARCH_LEN,
            storage_dir: None,
            log_format: LogFormat::default(),
        }
    }
}

impl StorefrontConfig {
    /// Loads configuration from `STOREFRONT_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if a variable is set to an unparsable
    /// value or the resulting configuration fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(origin) = env_string("STOREFRONT_ORIGIN") {
            config.origin = origin;
        }
        if let Some(key) = env_string("STOREFRONT_CART_KEY") {
            config.cart_key = key;
        }
        if let Some(key) = env_string("STOREFRONT_FAVORITES_KEY") {
            config.favorites_key = key;
        }
        if let Some(key) = env_string("STOREFRONT_COMPARE_KEY") {
            config.compare_key = key;
        }
        if let Some(capacity) = env_usize("STOREFRONT_COMPARE_CAPACITY")? {
            config.compare_capacity = capacity;
        }
        if let Some(size) = env_usize("STOREFRONT_DEFAULT_PAGE_SIZE")? {
            config.default_page_size = size;
        }
        if let Some(size) = env_usize("STOREFRONT_MAX_PAGE_SIZE")? {
            config.max_page_size = size;
        }
        if let Some(len) = env_usize("STOREFRONT_MAX_SEARCH_LEN")? {
            config.max_search_len = len;
        }
        config.storage_dir = env_string("STOREFRONT_STORAGE_DIR").map(PathBuf::from);
        if let Some(format) = env_string("STOREFRONT_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        for (name, key) in [
            ("cart_key", &self.cart_key),
            ("favorites_key", &self.favorites_key),
            ("compare_key", &self.compare_key),
        ] {
            if key.trim().is_empty() {
                return Err(Error::InvalidInput(format!("{name} cannot be empty")));
            }
            if validate_key(key).is_err() {
                return Err(Error::InvalidInput(format!(
                    "{name} must be a single key segment: {key}"
                )));
            }
        }
        if self.cart_key == self.favorites_key
            || self.cart_key == self.compare_key
            || self.favorites_key == self.compare_key
        {
            return Err(Error::InvalidInput(
                "collection storage keys must be distinct".to_string(),
            ));
        }
        if self.compare_capacity == 0 {
            return Err(Error::InvalidInput(
                "compare_capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(Error::InvalidInput(
                "max_page_size must be greater than 0".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(Error::InvalidInput(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    env_string(name)
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| Error::InvalidInput(format!("{name} must be a non-negative integer")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StorefrontConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.compare_capacity, 4);
        assert_eq!(config.cart_key, "cart");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = StorefrontConfig {
            compare_capacity: 0,
            ..StorefrontConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_default_page_size_above_max_rejected() {
        let config = StorefrontConfig {
            default_page_size: 200,
            ..StorefrontConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let config = StorefrontConfig {
            compare_key: "cart".to_string(),
            ..StorefrontConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_like_keys_rejected() {
        for bad in ["a/b", "..", "a\\b", "../cart"] {
            let config = StorefrontConfig {
                favorites_key: bad.to_string(),
                ..StorefrontConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::InvalidInput(_))),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: StorefrontConfig =
            serde_json::from_str(r#"{"origin":"tractors","compare_capacity":3}"#).expect("parse");
        assert_eq!(config.origin, "tractors");
        assert_eq!(config.compare_capacity, 3);
        assert_eq!(config.favorites_key, "favorites");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
