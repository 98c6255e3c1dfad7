//! End-to-end storefront scenarios across the catalog and collections.
//!
//! # Invariants Tested
//!
//! 1. **Browse then collect**: products found by the query engine can be
//!    carted, favorited and compared, and the badges follow
//! 2. **Storage failure is local**: a medium that rejects writes never
//!    surfaces an error and in-memory state stays authoritative
//! 3. **Malformed state resets**: a corrupted key reads as empty and is
//!    overwritten with an empty array
//! 4. **One write per mutation**: every changing call persists the whole
//!    collection exactly once; no-op calls write nothing
//! 5. **Durable across sessions**: a file-backed medium survives reopening
//! 6. **Feature filters**: drive layouts, cabin and new-arrival flags narrow
//!    the catalog and the drive travels into collection snapshots

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use storefront_catalog::{FilterState, PowerBucket, ProductId, SortKey};
use storefront_collections::Session;
use storefront_core::{FileStore, ScalarStore, StorefrontConfig};
use storefront_test_utils::{
    ProductFactory, StorageOp, TestContext, assert_entry_ids, assert_persisted_ids,
    assert_product_ids, assert_sorted_by, init_test_logging,
};

#[tokio::test]
async fn browse_then_collect() {
    init_test_logging();
    let ctx = TestContext::new();
    let engine = ProductFactory::engine();
    let mut session = ctx.session();

    let filter = FilterState::new(12)
        .with_category("mini-tractors")
        .stock_only(true)
        .sorted_by(SortKey::PriceAsc);
    let page = engine.execute(&filter).await.expect("query");
    assert_product_ids(&page.items, &[1, 2, 7, 4]);
    assert_sorted_by(&page.items, |p| p.price);

    let cheapest = &page.items[0];
    session.cart_mut().add_to_cart(cheapest);
    session.cart_mut().add_to_cart(cheapest);
    session.favorites_mut().toggle_favorite(page.items[1].id);
    for product in &page.items {
        session.compare_mut().toggle_compare(product);
    }

    let badges = session.badges();
    assert_eq!(badges.cart_items, 2);
    assert_eq!(badges.favorites, 1);
    assert_eq!(badges.compare, 4);
    assert_eq!(session.cart().total(), 500_000);

    let favorites = engine.lookup(&session.favorites().ids()).await.expect("lookup");
    assert_product_ids(&favorites, &[2]);
}

#[tokio::test]
async fn power_buckets_union_then_sort() {
    let engine = ProductFactory::engine();

    let filter = FilterState::new(12)
        .with_power_bucket(PowerBucket::Hp20To30)
        .with_power_bucket(PowerBucket::Hp50Plus)
        .sorted_by(SortKey::PowerDesc);
    let page = engine.execute(&filter).await.expect("query");

    assert_product_ids(&page.items, &[4, 2, 1]);
    assert_eq!(page.total_matched, 3);
    assert!(!page.has_more);
}

#[tokio::test]
async fn drive_and_feature_flags_narrow_the_catalog() {
    let engine = ProductFactory::engine();

    let filter = FilterState::new(12)
        .with_drive("4X4")
        .cabin_only(true)
        .sorted_by(SortKey::PriceAsc);
    let page = engine.execute(&filter).await.expect("query");
    assert_product_ids(&page.items, &[3, 4]);

    let page = engine.execute(&filter.new_only(true)).await.expect("query");
    assert_product_ids(&page.items, &[4]);

    let mut session = TestContext::new().session();
    let tractor = ProductFactory::from_catalog(4);
    session.compare_mut().add_to_compare(&tractor);
    assert_eq!(session.compare().items()[0].payload.drive.as_deref(), Some("4x4"));
}

#[tokio::test]
async fn search_then_paginate_reports_pre_slice_total() {
    let engine = ProductFactory::engine();

    let first = FilterState::new(2).with_manufacturer("DongFeng");
    let page = engine.execute(&first).await.expect("first page");
    assert_product_ids(&page.items, &[6, 2]);
    assert_eq!(page.total_matched, 2);
    assert_eq!(page.next_offset(), None);

    let beyond = first.at_offset(10);
    let page = engine.execute(&beyond).await.expect("beyond");
    assert!(page.items.is_empty());
    assert!(!page.has_more);
}

#[test]
fn storage_failure_keeps_memory_state() {
    init_test_logging();
    let ctx = TestContext::new();
    let mut session = ctx.session();
    ctx.storage.fail_all();

    session.cart_mut().add_to_cart(&ProductFactory::tractor(1, 50_000));
    session.cart_mut().add_to_cart(&ProductFactory::tractor(1, 50_000));
    session.compare_mut().add_to_compare(&ProductFactory::tractor(2, 10));

    assert_eq!(session.cart().total(), 100_000);
    assert!(session.cart().store().is_degraded());
    assert_eq!(ctx.storage.writes_to(&ctx.scoped_key("cart")), 0);

    ctx.storage.clear_failures();
    session.cart_mut().adjust_quantity(ProductId::new(1), 1);
    assert!(!session.cart().store().is_degraded());
    assert_persisted_ids(&ctx.storage, &ctx.scoped_key("cart"), &[1]);
}

#[test]
fn single_failed_write_is_repaired_by_next_mutation() {
    let ctx = TestContext::new();
    let mut session = ctx.session();
    let key = ctx.scoped_key("favorites");

    ctx.storage.fail_next_write(key.clone());
    session.favorites_mut().add_favorite(ProductId::new(1));
    assert!(ctx.storage.json(&key).is_none());

    session.favorites_mut().add_favorite(ProductId::new(2));
    assert_persisted_ids(&ctx.storage, &key, &[1, 2]);
}

#[test]
fn malformed_state_resets_to_empty_array() {
    let ctx = TestContext::new();
    let key = ctx.scoped_key("compare");
    ctx.storage.medium().set(&key, "[{\"name\":\"no id\"}]").expect("seed");

    let session = ctx.session();
    assert!(session.compare().items().is_empty());
    assert_eq!(ctx.storage.json(&key), Some(serde_json::json!([])));
}

#[test]
fn each_mutation_writes_once() {
    let ctx = TestContext::new();
    let mut session = ctx.session();
    let key = ctx.scoped_key("cart");
    let tractor = ProductFactory::tractor(3, 1_000);
    ctx.storage.clear_operations();

    session.cart_mut().add_to_cart(&tractor);
    session.cart_mut().update_quantity(tractor.id, 4);
    session.cart_mut().update_quantity(tractor.id, 4);
    session.cart_mut().remove_from_cart(ProductId::new(99));
    session.cart_mut().clear_cart();

    assert_eq!(ctx.storage.writes_to(&key), 3);
    assert!(ctx
        .storage
        .operations()
        .iter()
        .all(|op| !matches!(op, StorageOp::Remove { .. })));
    assert_eq!(ctx.storage.json(&key), Some(serde_json::json!([])));
}

#[test]
fn tabs_converge_through_storage_events() {
    let ctx = TestContext::new();
    let mut tab_a = ctx.session();
    let mut tab_b = ctx.session();

    for product in ProductFactory::sequence(6) {
        tab_a.compare_mut().add_to_compare(&product);
    }
    tab_b.sync();
    assert_entry_ids(tab_b.compare().items(), &[3, 4, 5, 6]);

    tab_b.compare_mut().remove_from_compare(ProductId::new(4));
    tab_a.sync();
    assert_entry_ids(tab_a.compare().items(), &[3, 5, 6]);
}

#[test]
fn origins_share_a_medium_without_collisions() {
    let ctx = TestContext::with_origin("shop");
    let other = StorefrontConfig {
        origin: "partner".to_string(),
        ..StorefrontConfig::default()
    };

    let mut shop = ctx.session();
    let mut partner = Session::open(&other, ctx.medium()).expect("partner");
    shop.favorites_mut().add_favorite(ProductId::new(1));
    partner.favorites_mut().add_favorite(ProductId::new(2));

    assert_persisted_ids(&ctx.storage, "origin=shop/favorites", &[1]);
    assert_persisted_ids(&ctx.storage, "origin=partner/favorites", &[2]);
}

#[test]
fn file_medium_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StorefrontConfig {
        origin: "shop".to_string(),
        storage_dir: Some(dir.path().to_path_buf()),
        ..StorefrontConfig::default()
    };

    {
        let mut session = Session::from_config(&config).expect("open");
        session.cart_mut().add_to_cart(&ProductFactory::from_catalog(2));
        session.cart_mut().add_to_cart(&ProductFactory::from_catalog(5));
        session.cart_mut().update_quantity(ProductId::new(5), 3);
    }

    let session = Session::from_config(&config).expect("reopen");
    assert_entry_ids(session.cart().items(), &[2, 5]);
    assert_eq!(session.cart().total(), 450_000 + 3 * 18_000);

    let medium = FileStore::open(dir.path()).expect("file store");
    assert!(medium.get("origin=shop/cart").expect("get").is_some());
}
