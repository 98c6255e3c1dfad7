//! Product data model.
//!
//! Products come from the repository (an external collaborator) and are
//! read-only to the catalog. Display-only fields are optional so partially
//! filled rows from the hosted store still deserialize.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog product as supplied by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Model designation (e.g. `DF-244`).
    #[serde(default)]
    pub model: Option<String>,
    /// Long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Category key (e.g. `mini-tractors`).
    pub category: String,
    /// Brand / manufacturer.
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Price in whole currency units.
    pub price: u64,
    /// Previous price, shown crossed out.
    #[serde(default)]
    pub old_price: Option<u64>,
    /// Primary image reference.
    #[serde(default)]
    pub image_url: String,
    /// Whether the product can be ordered now.
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    /// Whether the product is promoted ("hit").
    #[serde(default)]
    pub is_featured: bool,
    /// Engine power as free text, e.g. `"24 л.с."`.
    #[serde(default)]
    pub power: Option<String>,
    /// Drive layout, e.g. `"4x4"`.
    #[serde(default)]
    pub drive: Option<String>,
    /// Whether the machine ships with a cabin.
    #[serde(default)]
    pub has_cabin: bool,
    /// Whether the product is a new arrival.
    #[serde(default)]
    pub is_new: bool,
    /// Creation timestamp, used by the newest-first ordering.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Name fragment marking a cabin variant in rows without the flag.
const CABIN_MARKER: &str = "с кабиной";

fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Creates an in-stock product with the required fields; the slug is
    /// derived from the id and everything optional is left empty.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, category: impl Into<String>, price: u64) -> Self {
        Self {
            id: ProductId(id),
            name: name.into(),
            slug: format!("product-{id}"),
            model: None,
            description: None,
            category: category.into(),
            manufacturer: None,
            price,
            old_price: None,
            image_url: String::new(),
            in_stock: true,
            is_featured: false,
            power: None,
            drive: None,
            has_cabin: false,
            is_new: false,
            created_at: None,
        }
    }

    /// Sets the slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Sets the model designation.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the manufacturer.
    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Sets the power text.
    #[must_use]
    pub fn with_power(mut self, power: impl Into<String>) -> Self {
        self.power = Some(power.into());
        self
    }

    /// Sets the drive layout.
    #[must_use]
    pub fn with_drive(mut self, drive: impl Into<String>) -> Self {
        self.drive = Some(drive.into());
        self
    }

    /// Marks the product as shipping with a cabin.
    #[must_use]
    pub fn with_cabin(mut self) -> Self {
        self.has_cabin = true;
        self
    }

    /// Marks the product as a new arrival.
    #[must_use]
    pub fn new_arrival(mut self) -> Self {
        self.is_new = true;
        self
    }

    /// Sets the image reference.
    #[must_use]
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    /// Sets stock availability.
    #[must_use]
    pub fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Marks the product as featured.
    #[must_use]
    pub fn featured(mut self) -> Self {
        self.is_featured = true;
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Returns true if the product has a cabin, either flagged or named
    /// as a cabin variant.
    #[must_use]
    pub fn cabin(&self) -> bool {
        self.has_cabin || self.name.to_lowercase().contains(CABIN_MARKER)
    }

    /// Returns the engine power in horsepower, if the text has a leading number.
    #[must_use]
    pub fn power_hp(&self) -> Option<f64> {
        self.power.as_deref().and_then(parse_power)
    }
}

/// Extracts the leading number from a power description.
///
/// Accepts `"24"`, `"24 л.с."`, `"24.5hp"` and `"24,5 л.с."`. Returns
/// `None` if the text doesn't start with a digit.
#[must_use]
pub fn parse_power(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i > 0 && (c == '.' || c == ','))))
        .map_or(text.len(), |(i, _)| i);
    let number = text[..end].trim_end_matches(['.', ',']).replace(',', ".");
    if number.is_empty() {
        return None;
    }
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_power_variants() {
        assert_eq!(parse_power("24"), Some(24.0));
        assert_eq!(parse_power("24 л.с."), Some(24.0));
        assert_eq!(parse_power(" 24.5hp"), Some(24.5));
        assert_eq!(parse_power("24,5 л.с."), Some(24.5));
        assert_eq!(parse_power("50."), Some(50.0));
    }

    #[test]
    fn test_parse_power_rejects_non_numeric() {
        assert_eq!(parse_power(""), None);
        assert_eq!(parse_power("л.с."), None);
        assert_eq!(parse_power(".5"), None);
    }

    #[test]
    fn test_product_deserializes_sparse_row() {
        let product: Product = serde_json::from_str(
            r#"{"id":7,"name":"DF-244","slug":"df-244","category":"mini-tractors","price":450000}"#,
        )
        .expect("parse");
        assert_eq!(product.id, ProductId::new(7));
        assert!(product.in_stock);
        assert!(!product.is_featured);
        assert_eq!(product.power_hp(), None);
        assert_eq!(product.drive, None);
        assert!(!product.has_cabin);
        assert!(!product.is_new);
    }

    #[test]
    fn test_cabin_from_flag_or_name() {
        let flagged = Product::new(1, "DF-404", "mini-tractors", 1).with_cabin();
        let named = Product::new(2, "DF-404 С кабиной", "mini-tractors", 1);
        let open = Product::new(3, "DF-404", "mini-tractors", 1);

        assert!(flagged.cabin());
        assert!(named.cabin());
        assert!(!open.cabin());
    }

    #[test]
    fn test_product_id_is_transparent() {
        let json = serde_json::to_string(&ProductId::new(42)).expect("encode");
        assert_eq!(json, "42");
    }
}
