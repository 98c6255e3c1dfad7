//! Custom assertion helpers for integration tests.

use storefront_catalog::Product;
use storefront_collections::{CollectionEntry, EntryPayload};

use crate::storage::TracingStore;

/// Asserts that products appear with exactly the given ids, in order.
///
/// # Panics
///
/// Panics if the ids differ.
pub fn assert_product_ids<'a>(products: impl IntoIterator<Item = &'a Product>, expected: &[u64]) {
    let actual: Vec<u64> = products.into_iter().map(|p| p.id.get()).collect();
    assert_eq!(actual, expected, "unexpected product order");
}

/// Asserts that a collection holds exactly the given ids, in order.
///
/// # Panics
///
/// Panics if the ids differ.
pub fn assert_entry_ids<T: EntryPayload>(entries: &[CollectionEntry<T>], expected: &[u64]) {
    let actual: Vec<u64> = entries.iter().map(|e| e.id.get()).collect();
    assert_eq!(actual, expected, "unexpected collection contents");
}

/// Asserts that the array persisted under `key` holds exactly the given
/// ids, in order.
///
/// # Panics
///
/// Panics if the key is absent, not an array of ids or entries, or the
/// ids differ.
pub fn assert_persisted_ids(storage: &TracingStore, key: &str, expected: &[u64]) {
    let value = storage
        .json(key)
        .unwrap_or_else(|| panic!("nothing persisted under {key}"));
    let actual: Vec<u64> = value
        .as_array()
        .unwrap_or_else(|| panic!("{key} does not hold an array"))
        .iter()
        .map(|entry| {
            entry
                .as_u64()
                .or_else(|| entry["id"].as_u64())
                .expect("entry has an id")
        })
        .collect();
    assert_eq!(actual, expected, "unexpected persisted ids under {key}");
}

/// Asserts that a product list is non-decreasing by `key`.
///
/// # Panics
///
/// Panics on the first out-of-order pair.
pub fn assert_sorted_by<K: PartialOrd + std::fmt::Debug>(
    products: &[Product],
    key: impl Fn(&Product) -> K,
) {
    for pair in products.windows(2) {
        let (a, b) = (key(&pair[0]), key(&pair[1]));
        assert!(
            a <= b,
            "products {} and {} out of order: {a:?} > {b:?}",
            pair[0].id,
            pair[1].id
        );
    }
}

