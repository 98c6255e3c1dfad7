//! # storefront-collections
//!
//! Persistent client-side collections for the storefront: the shopping
//! cart, favorites and the comparison list.
//!
//! All three are instances of one generic engine, [`CollectionStore`],
//! configured by a [`CollectionPolicy`]:
//!
//! | Collection | Merge | Eviction | Payload |
//! |------------|-------|----------|---------|
//! | [`Cart`] | quantity increment | none | [`ProductSnapshot`] |
//! | [`Favorites`] | identity only | none | id only |
//! | [`Compare`] | identity only | FIFO, capacity 4 | [`ProductSnapshot`] |
//!
//! Every mutation persists the whole collection through a
//! [`DurableStore`](storefront_core::DurableStore), so state survives
//! reopening the session. Storage failures are logged and never surface to
//! callers.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use storefront_catalog::Product;
//! use storefront_collections::Session;
//! use storefront_core::{MemoryStore, StorefrontConfig};
//!
//! let medium = Arc::new(MemoryStore::new());
//! let mut session = Session::open(&StorefrontConfig::default(), medium).unwrap();
//!
//! let tractor = Product::new(1, "DF-244", "mini-tractors", 450_000);
//! session.cart_mut().add_to_cart(&tractor);
//! session.cart_mut().add_to_cart(&tractor);
//!
//! assert_eq!(session.cart().total(), 900_000);
//! assert_eq!(session.badges().cart_items, 2);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod cart;
pub mod compare;
pub mod entry;
pub mod favorites;
pub mod policy;
pub mod session;
pub mod store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cart::{Cart, CartLine, OrderLine};
    pub use crate::compare::Compare;
    pub use crate::entry::{CollectionEntry, ProductSnapshot};
    pub use crate::favorites::Favorites;
    pub use crate::session::{Badges, Session};
    pub use crate::store::{CollectionStore, Toggled, Upserted};
}

pub use cart::{Cart, CartLine, OrderLine};
pub use compare::{Compare, CompareItem};
pub use entry::{CollectionEntry, EntryPayload, ProductSnapshot};
pub use favorites::Favorites;
pub use policy::{CollectionPolicy, EvictionPolicy, MergePolicy};
pub use session::{Badges, Session};
pub use store::{CollectionStore, Toggled, Upserted};
