//! Per-origin session wiring.
//!
//! A [`Session`] opens the cart, favorites and comparison list of one origin
//! over a shared storage medium and routes change notifications from other
//! handles on that medium (other tabs) to the collection they concern.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use storefront_core::{
    DurableStore, Error, FileStore, MemoryStore, OriginScopedStore, Result, ScalarStore,
    StorageEvent, StorefrontConfig,
};

use crate::cart::Cart;
use crate::compare::Compare;
use crate::favorites::Favorites;

/// Counters shown in the site header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badges {
    /// Total units in the cart.
    pub cart_items: u64,
    /// Number of favorites.
    pub favorites: usize,
    /// Number of compared items.
    pub compare: usize,
}

/// The client collections of one origin.
#[derive(Debug)]
pub struct Session {
    scope: Arc<OriginScopedStore>,
    cart: Cart,
    favorites: Favorites,
    compare: Compare,
    events: Option<broadcast::Receiver<StorageEvent>>,
}

impl Session {
    /// Opens every collection of `config.origin` on `medium`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configuration or origin is
    /// invalid.
    pub fn open(config: &StorefrontConfig, medium: Arc<dyn ScalarStore>) -> Result<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.compare_capacity).ok_or_else(|| {
            Error::InvalidInput("compare_capacity must be greater than 0".to_string())
        })?;

        let scope = Arc::new(OriginScopedStore::new(medium, config.origin.clone())?);
        // Subscribe before hydrating so no foreign write slips between the two.
        let events = scope.subscribe();
        let store = DurableStore::new(Arc::clone(&scope) as Arc<dyn ScalarStore>);

        let session = Self {
            cart: Cart::open(store.clone(), config.cart_key.clone()),
            favorites: Favorites::open(store.clone(), config.favorites_key.clone()),
            compare: Compare::with_capacity(store, config.compare_key.clone(), capacity),
            scope,
            events,
        };

        tracing::info!(
            origin = session.origin(),
            cart = session.cart.items().len(),
            favorites = session.favorites.count(),
            compare = session.compare.items().len(),
            "opened storefront session"
        );
        Ok(session)
    }

    /// Opens a session on the medium described by `config`.
    ///
    /// Uses a [`FileStore`] under `config.storage_dir` when set, otherwise a
    /// fresh [`MemoryStore`].
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageUnavailable` if the storage directory cannot
    /// be created, or `Error::InvalidInput` for an invalid configuration.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let medium: Arc<dyn ScalarStore> = match &config.storage_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::open(config, medium)
    }

    /// Origin this session is scoped to.
    #[must_use]
    pub fn origin(&self) -> &str {
        self.scope.origin()
    }

    /// The shopping cart.
    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The shopping cart, mutably.
    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// The favorites list.
    #[must_use]
    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    /// The favorites list, mutably.
    pub fn favorites_mut(&mut self) -> &mut Favorites {
        &mut self.favorites
    }

    /// The comparison list.
    #[must_use]
    pub fn compare(&self) -> &Compare {
        &self.compare
    }

    /// The comparison list, mutably.
    pub fn compare_mut(&mut self) -> &mut Compare {
        &mut self.compare
    }

    /// Current header counters.
    #[must_use]
    pub fn badges(&self) -> Badges {
        Badges {
            cart_items: self.cart.item_count(),
            favorites: self.favorites.count(),
            compare: self.compare.items().len(),
        }
    }

    /// Applies every pending change notification without waiting.
    ///
    /// Returns the number of collections that changed.
    pub fn sync(&mut self) -> usize {
        let mut changed = 0;
        loop {
            let Some(events) = self.events.as_mut() else {
                return changed;
            };
            match events.try_recv() {
                Ok(event) => changed += self.apply(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "storage events lagged; reloading all collections");
                    changed += self.rehydrate_all();
                }
                Err(TryRecvError::Empty) => return changed,
                Err(TryRecvError::Closed) => {
                    self.events = None;
                    return changed;
                }
            }
        }
    }

    /// Waits for the next change notification and applies it.
    ///
    /// Returns the number of collections that changed, or `None` once the
    /// medium cannot deliver notifications.
    pub async fn next_change(&mut self) -> Option<usize> {
        let events = self.events.as_mut()?;
        match events.recv().await {
            Ok(event) => Some(self.apply(&event)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "storage events lagged; reloading all collections");
                Some(self.rehydrate_all())
            }
            Err(RecvError::Closed) => {
                self.events = None;
                None
            }
        }
    }

    /// Routes one medium-level event to the collections it concerns.
    ///
    /// Returns the number of collections that changed.
    pub fn apply(&mut self, event: &StorageEvent) -> usize {
        let Some(local) = self.scope.localize(event) else {
            return 0;
        };
        usize::from(self.cart.handle_storage_event(&local))
            + usize::from(self.favorites.handle_storage_event(&local))
            + usize::from(self.compare.handle_storage_event(&local))
    }

    fn rehydrate_all(&mut self) -> usize {
        usize::from(self.cart.store_mut().rehydrate())
            + usize::from(self.favorites.store_mut().rehydrate())
            + usize::from(self.compare.store_mut().rehydrate())
    }
}
