//! Collection entry data model.
//!
//! An entry pairs a product id with an optional quantity and a payload.
//! The payload is a denormalized snapshot of display fields captured at
//! insertion time, so a collection renders without a repository lookup.
//! Collections that persist identifiers only use the unit payload `()`;
//! their entries are stored as bare ids.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use storefront_catalog::{Product, ProductId};

/// Payload carried by a collection entry.
pub trait EntryPayload:
    Clone + fmt::Debug + PartialEq + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Returns true if the payload carries nothing worth persisting.
    fn is_empty(&self) -> bool {
        false
    }

    /// Unit price used by cart totals, if the payload has one.
    fn unit_price(&self) -> Option<u64> {
        None
    }
}

impl EntryPayload for () {
    fn is_empty(&self) -> bool {
        true
    }
}

/// Display fields captured when a product enters a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Display name.
    pub name: String,
    /// Price in whole currency units at insertion time.
    pub price: u64,
    /// Primary image reference.
    #[serde(default)]
    pub image_url: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Brand / manufacturer, shown in the comparison table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Power text, shown in the comparison table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    /// Drive layout, shown next to the power.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<String>,
}

impl EntryPayload for ProductSnapshot {
    fn unit_price(&self) -> Option<u64> {
        Some(self.price)
    }
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            slug: product.slug.clone(),
            manufacturer: product.manufacturer.clone(),
            power: product.power.clone(),
            drive: product.drive.clone(),
        }
    }
}

/// One item of a collection.
///
/// At most one entry per `id` exists in a collection. An entry with no
/// quantity and an empty payload is stored as its bare id, so an
/// identifier-only collection persists as `[7,12]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "StoredEntry<T>",
    into = "StoredEntry<T>",
    bound(serialize = "T: EntryPayload", deserialize = "T: EntryPayload")
)]
pub struct CollectionEntry<T> {
    /// Catalog item id.
    pub id: ProductId,
    /// Quantity, for quantity-merging collections.
    pub quantity: Option<u32>,
    /// Denormalized display fields.
    pub payload: T,
}

/// Stored form of an entry: a bare id or a full record.
#[derive(Serialize, Deserialize)]
#[serde(untagged, bound(serialize = "T: EntryPayload", deserialize = "T: EntryPayload"))]
enum StoredEntry<T> {
    Bare(ProductId),
    Record(EntryRecord<T>),
}

#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "T: EntryPayload", deserialize = "T: EntryPayload"))]
struct EntryRecord<T> {
    id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "EntryPayload::is_empty")]
    payload: T,
}

impl<T: EntryPayload> From<StoredEntry<T>> for CollectionEntry<T> {
    fn from(stored: StoredEntry<T>) -> Self {
        match stored {
            StoredEntry::Bare(id) => Self::new(id, T::default()),
            StoredEntry::Record(EntryRecord {
                id,
                quantity,
                payload,
            }) => Self {
                id,
                quantity,
                payload,
            },
        }
    }
}

impl<T: EntryPayload> From<CollectionEntry<T>> for StoredEntry<T> {
    fn from(entry: CollectionEntry<T>) -> Self {
        if entry.quantity.is_none() && entry.payload.is_empty() {
            return Self::Bare(entry.id);
        }
        Self::Record(EntryRecord {
            id: entry.id,
            quantity: entry.quantity,
            payload: entry.payload,
        })
    }
}

impl<T: EntryPayload> CollectionEntry<T> {
    /// Creates an entry without a quantity.
    #[must_use]
    pub fn new(id: ProductId, payload: T) -> Self {
        Self {
            id,
            quantity: None,
            payload,
        }
    }

    /// Sets the quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Returns `unit price × quantity`, treating a missing quantity as one.
    #[must_use]
    pub fn line_total(&self) -> u64 {
        let price = self.payload.unit_price().unwrap_or(0);
        price.saturating_mul(u64::from(self.quantity.unwrap_or(1)))
    }
}

impl CollectionEntry<()> {
    /// Creates an identifier-only entry.
    #[must_use]
    pub fn id_only(id: ProductId) -> Self {
        Self::new(id, ())
    }
}

impl CollectionEntry<ProductSnapshot> {
    /// Creates an entry snapshotting `product`.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self::new(product.id, ProductSnapshot::from(product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_only_entry_persists_as_bare_id() {
        let entries = vec![
            CollectionEntry::id_only(ProductId::new(7)),
            CollectionEntry::id_only(ProductId::new(12)),
        ];
        let json = serde_json::to_string(&entries).expect("encode");
        assert_eq!(json, "[7,12]");

        let back: Vec<CollectionEntry<()>> = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, entries);
    }

    #[test]
    fn test_id_only_entry_accepts_record_form() {
        let back: Vec<CollectionEntry<()>> =
            serde_json::from_str(r#"[{"id":7},12]"#).expect("decode");
        assert_eq!(
            back,
            vec![
                CollectionEntry::id_only(ProductId::new(7)),
                CollectionEntry::id_only(ProductId::new(12)),
            ]
        );
    }

    #[test]
    fn test_bare_id_hydrates_snapshot_entry_with_default_payload() {
        let back: CollectionEntry<ProductSnapshot> = serde_json::from_str("3").expect("decode");
        assert_eq!(back.id, ProductId::new(3));
        assert_eq!(back.payload, ProductSnapshot::default());
    }

    #[test]
    fn test_snapshot_entry_keeps_payload_and_quantity() {
        let product = Product::new(1, "DF-244", "mini-tractors", 450_000).with_slug("df-244");
        let entry = CollectionEntry::from_product(&product).with_quantity(2);
        let json = serde_json::to_string(&entry).expect("encode");
        assert_eq!(
            json,
            r#"{"id":1,"quantity":2,"payload":{"name":"DF-244","price":450000,"image_url":"","slug":"df-244"}}"#
        );
    }

    #[test]
    fn test_snapshot_captures_drive() {
        let product = Product::new(4, "LOVOL TE-504", "mini-tractors", 1).with_drive("4x4");
        let snapshot = ProductSnapshot::from(&product);
        assert_eq!(snapshot.drive.as_deref(), Some("4x4"));

        let json = serde_json::to_value(&snapshot).expect("encode");
        assert_eq!(json["drive"], "4x4");
    }

    #[test]
    fn test_entry_without_id_is_rejected() {
        let result: Result<CollectionEntry<ProductSnapshot>, _> =
            serde_json::from_str(r#"{"payload":{"name":"x","price":1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_line_total() {
        let product = Product::new(1, "Плуг", "equipment", 38_000);
        let entry = CollectionEntry::from_product(&product).with_quantity(3);
        assert_eq!(entry.line_total(), 114_000);
        assert_eq!(CollectionEntry::id_only(ProductId::new(1)).line_total(), 0);
    }
}
