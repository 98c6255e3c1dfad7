//! Generic persistent collection store.
//!
//! [`CollectionStore`] owns an ordered list of [`CollectionEntry`] values,
//! mirrors it to one key of the durable medium, and exposes read-only
//! snapshots plus a change subscription. Cart, favorites and compare are
//! thin wrappers that pick a [`CollectionPolicy`] and a payload type.
//!
//! ## Lifecycle
//!
//! Construction hydrates synchronously, so a store is never observable
//! before its persisted state has been read. Every mutation that changes
//! the list persists the whole list under the store's key before returning.
//!
//! ## Failure Handling
//!
//! Storage failures never reach the caller. A failed write leaves the
//! in-memory list authoritative for the rest of the session; a malformed
//! persisted value is replaced with an empty list on hydration.

use std::fmt;

use tokio::sync::watch;

use storefront_catalog::ProductId;
use storefront_core::observability::collection_span;
use storefront_core::{DurableStore, Lookup, StorageEvent, metrics};

use crate::entry::{CollectionEntry, EntryPayload};
use crate::policy::{CollectionPolicy, EvictionPolicy, MergePolicy};

/// Outcome of [`CollectionStore::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    /// The id was new and was appended.
    Inserted {
        /// Oldest entry dropped to stay within capacity.
        evicted: Option<CollectionEntry<T>>,
    },
    /// The id was present and its quantity changed.
    Merged {
        /// Quantity after the merge.
        quantity: u32,
    },
    /// The id was present and removed because its quantity fell to zero.
    Removed,
    /// Nothing changed.
    Unchanged,
}

impl<T> Upserted<T> {
    /// Returns true if the collection changed.
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Outcome of [`CollectionStore::toggle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Toggled<T> {
    /// The id was absent and was added.
    Added {
        /// Oldest entry dropped to stay within capacity.
        evicted: Option<CollectionEntry<T>>,
    },
    /// The id was present and was removed.
    Removed,
}

impl<T> Toggled<T> {
    /// Returns true if the id is present after the toggle.
    #[must_use]
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

/// A persistent, ordered, id-unique collection.
pub struct CollectionStore<T: EntryPayload> {
    name: &'static str,
    key: String,
    policy: CollectionPolicy,
    entries: Vec<CollectionEntry<T>>,
    store: DurableStore,
    snapshots: watch::Sender<Vec<CollectionEntry<T>>>,
}

impl<T: EntryPayload> fmt::Debug for CollectionStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionStore")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl<T: EntryPayload> CollectionStore<T> {
    /// Opens the collection stored under `key`, hydrating it immediately.
    ///
    /// `name` labels logs and metrics (`"cart"`, `"favorites"`, ...).
    pub fn open(
        name: &'static str,
        key: impl Into<String>,
        policy: CollectionPolicy,
        store: DurableStore,
    ) -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        let mut collection = Self {
            name,
            key: key.into(),
            policy,
            entries: Vec::new(),
            store,
            snapshots,
        };
        collection.hydrate();
        collection
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Key this collection persists under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Merge and eviction policy.
    #[must_use]
    pub fn policy(&self) -> CollectionPolicy {
        self.policy
    }

    /// Read-only view of the entries in insertion order.
    #[must_use]
    pub fn list(&self) -> &[CollectionEntry<T>] {
        &self.entries
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Returns the entry for `id`.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CollectionEntry<T>> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Returns true if `id` is present.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.position(id).is_some()
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the collection has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of quantities; entries without a quantity count as one.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| u64::from(e.quantity.unwrap_or(1)))
            .sum()
    }

    /// Returns true while the durable medium is rejecting operations.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    /// Subscribes to snapshots published after every change.
    ///
    /// The receiver starts at the current list.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CollectionEntry<T>>> {
        self.snapshots.subscribe()
    }

    /// Inserts `entry`, merging with an existing entry per the policy.
    ///
    /// For quantity-tracking collections a present id has its quantity
    /// incremented by `entry.quantity` (default one); a new id starts at
    /// that quantity. Set-like collections leave a present id untouched.
    pub fn upsert(&mut self, entry: CollectionEntry<T>) -> Upserted<T> {
        let _guard = collection_span("upsert", self.name).entered();

        let increment = entry.quantity.unwrap_or(1).max(1);
        let outcome = match (self.position(entry.id), self.policy.merge) {
            (Some(_), MergePolicy::IdentityOnly) => Upserted::Unchanged,
            (Some(index), MergePolicy::QuantityIncrement) => {
                let slot = &mut self.entries[index];
                let quantity = slot.quantity.unwrap_or(1).saturating_add(increment);
                slot.quantity = Some(quantity);
                Upserted::Merged { quantity }
            }
            (None, merge) => {
                let mut entry = entry;
                entry.quantity = match merge {
                    MergePolicy::QuantityIncrement => Some(increment),
                    MergePolicy::IdentityOnly => None,
                };
                let evicted = self.append(entry);
                Upserted::Inserted { evicted }
            }
        };

        if outcome.is_change() {
            self.commit("upsert");
        }
        outcome
    }

    /// Sets the quantity of `entry.id` directly instead of incrementing.
    ///
    /// A quantity of zero or less removes a present entry and is a no-op
    /// for an absent one.
    pub fn upsert_with_quantity(
        &mut self,
        entry: CollectionEntry<T>,
        quantity: i64,
    ) -> Upserted<T> {
        let _guard = collection_span("upsert_with_quantity", self.name).entered();

        if !self.policy.tracks_quantity() {
            tracing::debug!(collection = self.name, "ignoring quantity on set-like collection");
            return self.upsert(entry);
        }

        let outcome = match (self.position(entry.id), clamp_quantity(quantity)) {
            (None, None) => Upserted::Unchanged,
            (Some(index), None) => {
                self.entries.remove(index);
                Upserted::Removed
            }
            (Some(index), Some(quantity)) => {
                let slot = &mut self.entries[index];
                if slot.quantity == Some(quantity) {
                    Upserted::Unchanged
                } else {
                    slot.quantity = Some(quantity);
                    Upserted::Merged { quantity }
                }
            }
            (None, Some(quantity)) => {
                let evicted = self.append(entry.with_quantity(quantity));
                Upserted::Inserted { evicted }
            }
        };

        if outcome.is_change() {
            self.commit("upsert_with_quantity");
        }
        outcome
    }

    /// Sets the quantity of a present entry.
    ///
    /// A quantity of zero or less removes the entry. Absent ids and
    /// set-like collections are left untouched. Returns whether the
    /// collection changed.
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        let _guard = collection_span("set_quantity", self.name).entered();

        if !self.policy.tracks_quantity() {
            tracing::debug!(collection = self.name, %id, "set-like collection has no quantities");
            return false;
        }
        let Some(index) = self.position(id) else {
            return false;
        };

        match clamp_quantity(quantity) {
            None => {
                self.entries.remove(index);
            }
            Some(quantity) if self.entries[index].quantity == Some(quantity) => return false,
            Some(quantity) => self.entries[index].quantity = Some(quantity),
        }
        self.commit("set_quantity");
        true
    }

    /// Removes `id`. Returns whether it was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let _guard = collection_span("remove", self.name).entered();

        let Some(index) = self.position(id) else {
            return false;
        };
        self.entries.remove(index);
        self.commit("remove");
        true
    }

    /// Removes every entry and persists the empty list.
    pub fn clear(&mut self) {
        let _guard = collection_span("clear", self.name).entered();

        self.entries.clear();
        self.commit("clear");
    }

    /// Removes `entry.id` if present, otherwise inserts `entry`.
    pub fn toggle(&mut self, entry: CollectionEntry<T>) -> Toggled<T> {
        let _guard = collection_span("toggle", self.name).entered();

        if let Some(index) = self.position(entry.id) {
            self.entries.remove(index);
            self.commit("toggle");
            return Toggled::Removed;
        }

        let mut entry = entry;
        if self.policy.tracks_quantity() {
            entry.quantity = Some(entry.quantity.unwrap_or(1).max(1));
        } else {
            entry.quantity = None;
        }
        let evicted = self.append(entry);
        self.commit("toggle");
        Toggled::Added { evicted }
    }

    /// Re-reads the persisted list if `event` concerns this collection.
    ///
    /// `event` must be expressed in the same key space as [`Self::key`].
    /// Returns whether the in-memory list changed.
    pub fn handle_storage_event(&mut self, event: &StorageEvent) -> bool {
        if !event.concerns(&self.key) {
            return false;
        }
        let _guard = collection_span("rehydrate", self.name).entered();
        self.hydrate()
    }

    /// Re-reads the persisted list unconditionally.
    ///
    /// Returns whether the in-memory list changed.
    pub fn rehydrate(&mut self) -> bool {
        let _guard = collection_span("rehydrate", self.name).entered();
        self.hydrate()
    }

    fn position(&self, id: ProductId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Appends a new entry, evicting the oldest one if the policy requires.
    fn append(&mut self, entry: CollectionEntry<T>) -> Option<CollectionEntry<T>> {
        let evicted = match self.policy.eviction {
            EvictionPolicy::Fifo { capacity } if self.entries.len() >= capacity.get() => {
                Some(self.entries.remove(0))
            }
            _ => None,
        };
        if let Some(old) = &evicted {
            tracing::debug!(collection = self.name, evicted = %old.id, "evicted oldest entry");
        }
        self.entries.push(entry);
        evicted
    }

    fn commit(&mut self, op: &'static str) {
        metrics::record_mutation(self.name, op);
        if !self.store.set(&self.key, &self.entries) {
            tracing::debug!(
                collection = self.name,
                op,
                "keeping in-memory state after failed write"
            );
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.entries.clone());
    }

    /// Loads the persisted list, normalizing it to the policy.
    fn hydrate(&mut self) -> bool {
        let loaded = match self.store.lookup::<Vec<CollectionEntry<T>>>(&self.key) {
            Lookup::Found(entries) => {
                let (entries, repaired) = normalize(entries, self.policy);
                if repaired {
                    tracing::info!(collection = self.name, "repaired persisted collection");
                    self.store.set(&self.key, &entries);
                }
                entries
            }
            Lookup::Absent => Vec::new(),
            Lookup::Malformed(_) => {
                self.store.set(&self.key, &Vec::<CollectionEntry<T>>::new());
                Vec::new()
            }
            // Keep what we have; the medium may come back.
            Lookup::Unavailable(_) => return false,
        };

        if loaded == self.entries {
            return false;
        }
        tracing::debug!(collection = self.name, count = loaded.len(), "hydrated collection");
        self.entries = loaded;
        self.publish();
        true
    }
}

/// Maps a caller-supplied quantity to a stored one; `None` means "remove".
fn clamp_quantity(quantity: i64) -> Option<u32> {
    if quantity <= 0 {
        None
    } else {
        Some(u32::try_from(quantity).unwrap_or(u32::MAX))
    }
}

/// Brings a decoded list in line with `policy`.
///
/// Duplicate ids keep their first occurrence. Quantity-tracking lists drop
/// entries without a positive quantity; set-like lists drop quantities.
/// Bounded lists keep their newest entries. Returns whether anything
/// changed.
fn normalize<T: EntryPayload>(
    entries: Vec<CollectionEntry<T>>,
    policy: CollectionPolicy,
) -> (Vec<CollectionEntry<T>>, bool) {
    let original_len = entries.len();
    let mut repaired = false;
    let mut seen = std::collections::HashSet::with_capacity(original_len);
    let mut kept = Vec::with_capacity(original_len);

    for mut entry in entries {
        if !seen.insert(entry.id) {
            continue;
        }
        if policy.tracks_quantity() {
            if entry.quantity.unwrap_or(0) == 0 {
                continue;
            }
        } else if entry.quantity.take().is_some() {
            repaired = true;
        }
        kept.push(entry);
    }

    if let Some(capacity) = policy.capacity() {
        let excess = kept.len().saturating_sub(capacity.get());
        kept.drain(..excess);
    }

    repaired |= kept.len() != original_len;
    (kept, repaired)
}
