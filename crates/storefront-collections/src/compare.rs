//! Comparison list.
//!
//! A set-like rolling window of product snapshots. When full, adding a new
//! product evicts the oldest one.

use std::num::NonZeroUsize;

use tokio::sync::watch;

use storefront_catalog::{Product, ProductId};
use storefront_core::config::DEFAULT_COMPARE_CAPACITY;
use storefront_core::{DurableStore, StorageEvent};

use crate::entry::{CollectionEntry, ProductSnapshot};
use crate::policy::CollectionPolicy;
use crate::store::{CollectionStore, Toggled, Upserted};

/// One compared item.
pub type CompareItem = CollectionEntry<ProductSnapshot>;

/// Persistent comparison list.
#[derive(Debug)]
pub struct Compare {
    inner: CollectionStore<ProductSnapshot>,
    capacity: NonZeroUsize,
}

impl Compare {
    /// Collection label used in logs and metrics.
    pub const NAME: &'static str = "compare";

    /// Opens the comparison list stored under `key` with the default
    /// capacity.
    pub fn open(store: DurableStore, key: impl Into<String>) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_COMPARE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::with_capacity(store, key, capacity)
    }

    /// Opens the comparison list with an explicit capacity.
    pub fn with_capacity(
        store: DurableStore,
        key: impl Into<String>,
        capacity: NonZeroUsize,
    ) -> Self {
        let policy = CollectionPolicy::compare(capacity);
        Self {
            inner: CollectionStore::open(Self::NAME, key, policy, store),
            capacity,
        }
    }

    /// Maximum number of compared items.
    #[must_use]
    pub fn max_compare(&self) -> usize {
        self.capacity.get()
    }

    /// Adds `product` if absent, evicting the oldest item when full.
    ///
    /// Returns the evicted item's id.
    pub fn add_to_compare(&mut self, product: &Product) -> Option<ProductId> {
        match self.inner.upsert(CollectionEntry::from_product(product)) {
            Upserted::Inserted { evicted } => evicted.map(|e| e.id),
            _ => None,
        }
    }

    /// Removes `product` if present, otherwise adds it.
    pub fn toggle_compare(&mut self, product: &Product) -> Toggled<ProductSnapshot> {
        self.inner.toggle(CollectionEntry::from_product(product))
    }

    /// Removes `id`. Returns whether it was present.
    pub fn remove_from_compare(&mut self, id: ProductId) -> bool {
        self.inner.remove(id)
    }

    /// Empties the list.
    pub fn clear_compare(&mut self) {
        self.inner.clear();
    }

    /// Returns true if `id` is being compared.
    #[must_use]
    pub fn is_in_compare(&self, id: ProductId) -> bool {
        self.inner.contains(id)
    }

    /// Returns true if adding a new product would evict one.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.count() >= self.capacity.get()
    }

    /// Compared items, oldest first.
    #[must_use]
    pub fn items(&self) -> &[CompareItem] {
        self.inner.list()
    }

    /// Subscribes to comparison snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CompareItem>> {
        self.inner.subscribe()
    }

    /// Re-reads the list if `event` concerns it.
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
