//! Shopping cart.
//!
//! A quantity-merging, unbounded collection of product snapshots. Adding a
//! product already in the cart increments its quantity; setting a quantity
//! of zero or less removes the line.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use storefront_catalog::{Product, ProductId};
use storefront_core::{DurableStore, StorageEvent};

use crate::entry::{CollectionEntry, ProductSnapshot};
use crate::policy::CollectionPolicy;
use crate::store::{CollectionStore, Upserted};

/// One cart line.
pub type CartLine = CollectionEntry<ProductSnapshot>;

/// Order line handed to checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Ordered product.
    pub product_id: ProductId,
    /// Ordered quantity.
    pub quantity: u32,
    /// Unit price captured when the line was added.
    pub unit_price: u64,
}

/// Persistent shopping cart.
#[derive(Debug)]
pub struct Cart {
    inner: CollectionStore<ProductSnapshot>,
}

impl Cart {
    /// Collection label used in logs and metrics.
    pub const NAME: &'static str = "cart";

    /// Opens the cart stored under `key`.
    pub fn open(store: DurableStore, key: impl Into<String>) -> Self {
        Self {
            inner: CollectionStore::open(Self::NAME, key, CollectionPolicy::cart(), store),
        }
    }

    /// Adds one unit of `product`, or increments its line.
    pub fn add_to_cart(&mut self, product: &Product) -> Upserted<ProductSnapshot> {
        self.inner.upsert(CollectionEntry::from_product(product))
    }

    /// Adds `quantity` units of a snapshotted product.
    ///
    /// Quantities of zero are treated as one.
    pub fn add_snapshot(
        &mut self,
        id: ProductId,
        snapshot: ProductSnapshot,
        quantity: u32,
    ) -> Upserted<ProductSnapshot> {
        self.inner
            .upsert(CollectionEntry::new(id, snapshot).with_quantity(quantity.max(1)))
    }

    /// Removes the line for `id`. Returns whether it was present.
    pub fn remove_from_cart(&mut self, id: ProductId) -> bool {
        self.inner.remove(id)
    }

    /// Sets the quantity of a line; zero or less removes it.
    ///
    /// Returns whether the cart changed.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        self.inner.set_quantity(id, quantity)
    }

    /// Changes the quantity of a line by `delta` (the +/- buttons).
    ///
    /// Dropping to zero removes the line. Returns whether the cart changed.
    pub fn adjust_quantity(&mut self, id: ProductId, delta: i64) -> bool {
        let Some(current) = self.inner.get(id).and_then(|line| line.quantity) else {
            return false;
        };
        self.inner.set_quantity(id, i64::from(current).saturating_add(delta))
    }

    /// Empties the cart.
    pub fn clear_cart(&mut self) {
        self.inner.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        self.inner.list()
    }

    /// Returns the line for `id`.
    #[must_use]
    pub fn line(&self, id: ProductId) -> Option<&CartLine> {
        self.inner.get(id)
    }

    /// Returns true if `id` is in the cart.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.inner.contains(id)
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.inner
            .list()
            .iter()
            .fold(0u64, |total, line| total.saturating_add(line.line_total()))
    }

    /// Total number of units (the header badge).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner.total_quantity()
    }

    /// `price × quantity` of one line, or zero if absent.
    #[must_use]
    pub fn line_total(&self, id: ProductId) -> u64 {
        self.inner.get(id).map_or(0, CollectionEntry::line_total)
    }

    /// Converts the cart into checkout order lines.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.inner
            .list()
            .iter()
            .map(|line| OrderLine {
                product_id: line.id,
                quantity: line.quantity.unwrap_or(1),
                unit_price: line.payload.price,
            })
            .collect()
    }

    /// Subscribes to cart snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLine>> {
        self.inner.subscribe()
    }

    /// Re-reads the cart if `event` concerns it.
    pub fn handle_storage_event(&mut self, event: &StorageEvent) -> bool {
        self.inner.handle_storage_event(event)
    }

    /// Underlying generic store.
    #[must_use]
    pub fn store(&self) -> &CollectionStore<ProductSnapshot> {
        &self.inner
    }

    pub(crate) fn store_mut(&mut self) -> &mut CollectionStore<ProductSnapshot> {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storefront_core::MemoryStore;

    use super::*;

    fn cart() -> Cart {
        Cart::open(DurableStore::new(Arc::new(MemoryStore::new())), "cart")
    }

    #[test]
    fn test_adding_twice_merges_into_one_line() {
        let mut cart = cart();
        let tractor = Product::new(1, "Трактор", "tractors", 50_000);

        cart.add_to_cart(&tractor);
        cart.add_to_cart(&tractor);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, Some(2));
        assert_eq!(cart.total(), 100_000);
    }

    #[test]
    fn test_adjust_quantity_steps_and_removes_at_zero() {
        let mut cart = cart();
        let id = ProductId::new(5);
        cart.add_to_cart(&Product::new(5, "Фреза", "equipment", 1_200));

        assert!(cart.adjust_quantity(id, 1));
        assert_eq!(cart.line(id).and_then(|l| l.quantity), Some(2));
        assert!(cart.adjust_quantity(id, -1));
        assert!(cart.adjust_quantity(id, -1));
        assert!(!cart.contains(id));
        assert!(!cart.adjust_quantity(id, 1));
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let mut cart = cart();
        cart.add_to_cart(&Product::new(1, "a", "c", 10));
        cart.add_snapshot(
            ProductId::new(2),
            ProductSnapshot {
                name: "b".into(),
                price: 20,
                ..ProductSnapshot::default()
            },
            3,
        );

        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.line_total(ProductId::new(2)), 60);
        assert_eq!(cart.line_total(ProductId::new(9)), 0);
    }

    #[test]
    fn test_order_lines_carry_unit_prices() {
        let mut cart = cart();
        let plough = Product::new(3, "Плуг", "equipment", 2_500);
        cart.add_to_cart(&plough);
        cart.update_quantity(plough.id, 4);

        assert_eq!(
            cart.order_lines(),
            vec![OrderLine {
                product_id: plough.id,
                quantity: 4,
                unit_price: 2_500,
            }]
        );
        let json = serde_json::to_string(&cart.order_lines()).expect("encode");
        assert_eq!(json, r#"[{"productId":3,"quantity":4,"unitPrice":2500}]"#);
    }

    #[test]
    fn test_clear_cart() {
        let mut cart = cart();
        cart.add_to_cart(&Product::new(1, "a", "c", 10));
        cart.clear_cart();
        assert!(cart.items().is_empty());
        assert_eq!(cart.total(), 0);
    }
}
