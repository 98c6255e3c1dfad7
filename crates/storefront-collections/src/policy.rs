//! Merge and eviction policies.
//!
//! A [`CollectionPolicy`] decides what the generic store does when an id is
//! inserted twice and when a bounded collection is full. Capacity only
//! exists together with FIFO eviction; a collection without eviction is
//! unbounded.

use std::num::NonZeroUsize;

/// What happens when an already-present id is inserted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Increment (or directly set) the entry's quantity in place.
    QuantityIncrement,
    /// Keep the existing entry untouched.
    IdentityOnly,
}

/// What happens when a new id is inserted into a full collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Never evict; the collection is unbounded.
    None,
    /// Drop the oldest entry to make room.
    Fifo {
        /// Maximum number of entries.
        capacity: NonZeroUsize,
    },
}

/// Combined policy of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionPolicy {
    /// Duplicate-insert behaviour.
    pub merge: MergePolicy,
    /// Full-collection behaviour.
    pub eviction: EvictionPolicy,
}

impl CollectionPolicy {
    /// Quantity-merging, unbounded (shopping cart).
    #[must_use]
    pub const fn cart() -> Self {
        Self {
            merge: MergePolicy::QuantityIncrement,
            eviction: EvictionPolicy::None,
        }
    }

    /// Set-like, unbounded (favorites).
    #[must_use]
    pub const fn favorites() -> Self {
        Self {
            merge: MergePolicy::IdentityOnly,
            eviction: EvictionPolicy::None,
        }
    }

    /// Set-like rolling window of `capacity` entries (comparison list).
    #[must_use]
    pub const fn compare(capacity: NonZeroUsize) -> Self {
        Self {
            merge: MergePolicy::IdentityOnly,
            eviction: EvictionPolicy::Fifo { capacity },
        }
    }

    /// Returns the capacity, or `None` when unbounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<NonZeroUsize> {
        match self.eviction {
            EvictionPolicy::None => None,
            EvictionPolicy::Fifo { capacity } => Some(capacity),
        }
    }

    /// Returns true if entries carry quantities.
    #[must_use]
    pub const fn tracks_quantity(&self) -> bool {
        matches!(self.merge, MergePolicy::QuantityIncrement)
    }
}
