//! Favorites.
//!
//! A set-like, unbounded collection of product ids. Only identifiers are
//! persisted; callers resolve them against the catalog for display.

use tokio::sync::watch;

use storefront_catalog::{Product, ProductId};
use storefront_core::{DurableStore, StorageEvent};

use crate::entry::CollectionEntry;
use crate::policy::CollectionPolicy;
use crate::store::CollectionStore;

/// Persistent favorites list.
#[derive(Debug)]
pub struct Favorites {
    inner: CollectionStore<()>,
}

impl Favorites {
    /// Collection label used in logs and metrics.
    pub const NAME: &'static str = "favorites";

    /// Opens the favorites stored under `key`.
    pub fn open(store: DurableStore, key: impl Into<String>) -> Self {
        Self {
            inner: CollectionStore::open(Self::NAME, key, CollectionPolicy::favorites(), store),
        }
    }

    /// Adds `id`. Returns whether it was newly added.
    pub fn add_favorite(&mut self, id: ProductId) -> bool {
        self.inner.upsert(CollectionEntry::id_only(id)).is_change()
    }

    /// Removes `id`. Returns whether it was present.
    pub fn remove_favorite(&mut self, id: ProductId) -> bool {
        self.inner.remove(id)
    }

    /// Flips membership of `id`. Returns whether it is now a favorite.
    pub fn toggle_favorite(&mut self, id: ProductId) -> bool {
        self.inner.toggle(CollectionEntry::id_only(id)).is_added()
    }

    /// Returns true if `id` is a favorite.
    #[must_use]
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.inner.contains(id)
    }

    /// Favorite ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        self.inner.ids()
    }

    /// Number of favorites.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// Removes every favorite.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Looks up favorites in `products`, preserving favorite order.
    ///
    /// Ids no longer in the catalog are skipped.
    #[must_use]
    pub fn resolve<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        self.inner
            .list()
            .iter()
            .filter_map(|entry| products.iter().find(|p| p.id == entry.id))
            .collect()
    }

    /// Subscribes to favorites snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CollectionEntry<()>>> {
        self.inner.subscribe()
    }

    /// Re-reads the favorites if `event` concerns them.
    pub fn handle_storage_event(&mut self, event: &StorageEvent) -> bool {
        self.inner.handle_storage_event(event)
    }

    /// Underlying generic store.
    #[must_use]
    pub fn store(&self) -> &CollectionStore<()> {
        &self.inner
    }

    pub(crate) fn store_mut(&mut self) -> &mut CollectionStore<()> {
        &mut self.inner
    }
}
