//! Pre-built test fixtures for common test scenarios.
//!
//! Provides factory functions to create test data with sensible defaults.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use storefront_catalog::{CatalogQueryEngine, InMemoryRepository, Product, ProductId};
use storefront_collections::Session;
use storefront_core::{DurableStore, ScalarStore, StorefrontConfig};

use crate::storage::TracingStore;

/// Test context with a shared medium and a fixed origin.
pub struct TestContext {
    /// Shared storage medium.
    pub storage: TracingStore,
    /// Configuration every session opened from this context uses.
    pub config: StorefrontConfig,
}

impl TestContext {
    /// Creates a context for the `shop` origin with default settings.
    pub fn new() -> Self {
        Self::with_origin("shop")
    }

    /// Creates a context for a specific origin.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            storage: TracingStore::new(),
            config: StorefrontConfig {
                origin: origin.into(),
                ..StorefrontConfig::default()
            },
        }
    }

    /// Opens a session on the shared medium (one "tab").
    pub fn session(&self) -> Session {
        Session::open(&self.config, self.medium()).expect("valid test config")
    }

    /// The shared medium as a trait object.
    pub fn medium(&self) -> Arc<dyn ScalarStore> {
        Arc::new(self.storage.clone())
    }

    /// A durable store over the unscoped medium.
    pub fn durable(&self) -> DurableStore {
        DurableStore::new(self.medium())
    }

    /// Returns the medium key a collection key is stored under.
    pub fn scoped_key(&self, key: &str) -> String {
        format!("origin={}/{key}", self.config.origin)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for creating catalog products.
pub struct ProductFactory;

impl ProductFactory {
    /// Fixed reference time that `created_at` offsets count from.
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    /// A mini-tractor with the given id and price.
    pub fn tractor(id: u64, price: u64) -> Product {
        Product::new(id, format!("Трактор {id}"), "mini-tractors", price)
            .with_slug(format!("tractor-{id}"))
    }

    /// `count` products with ids `1..=count`, each created one day after
    /// the previous one and priced `id * 1000`.
    pub fn sequence(count: u64) -> Vec<Product> {
        (1..=count)
            .map(|id| {
                let age = Duration::days(i64::try_from(id).expect("small id"));
                Self::tractor(id, id * 1_000).created(Self::epoch() + age)
            })
            .collect()
    }

    /// A small mixed catalog.
    ///
    /// | id | name | category | brand | price | power | drive | stock | featured |
    /// |----|------|----------|-------|-------|-------|-------|-------|----------|
    /// | 1 | Уралец 220 | mini-tractors | Уралец | 250 000 | 22 л.с. | 4x2 | yes | no |
    /// | 2 | DongFeng DF-244 | mini-tractors | DongFeng | 450 000 | 24 л.с. | 4x4 | yes | yes |
    /// | 3 | Xingtai XT-404 | mini-tractors | Xingtai | 620 000 | 40 л.с. | 4x4 | no | no |
    /// | 4 | Русич Т-50 | mini-tractors | Русич | 780 000 | 50 л.с. | 4x4 | yes | yes |
    /// | 5 | Плуг ПН-1-20 | equipment | Уралец | 18 000 | - | - | yes | no |
    /// | 6 | Фреза ФН-1.2 | equipment | DongFeng | 42 000 | - | - | yes | no |
    /// | 7 | Jinma JM-354 | mini-tractors | Jinma | 540 000 | 35,5 л.с. | 4x2 | yes | no |
    /// | 8 | Косилка КР-1 | equipment | Jinma | 29 000 | - | - | no | no |
    ///
    /// Products 3 and 4 have a cabin; products 2 and 4 are new arrivals.
    ///
    /// Product `n` is created `n` days after [`epoch`](Self::epoch).
    pub fn catalog() -> Vec<Product> {
        let at = |days: i64| Self::epoch() + Duration::days(days);
        vec![
            Product::new(1, "Уралец 220", "mini-tractors", 250_000)
                .with_slug("uralets-220")
                .with_manufacturer("Уралец")
                .with_power("22 л.с.")
                .with_drive("4x2")
                .created(at(1)),
            Product::new(2, "DongFeng DF-244", "mini-tractors", 450_000)
                .with_slug("dongfeng-df-244")
                .with_model("DF-244")
                .with_manufacturer("DongFeng")
                .with_power("24 л.с.")
                .with_drive("4x4")
                .featured()
                .new_arrival()
                .created(at(2)),
            Product::new(3, "Xingtai XT-404", "mini-tractors", 620_000)
                .with_slug("xingtai-xt-404")
                .with_model("XT-404")
                .with_manufacturer("Xingtai")
                .with_power("40 л.с.")
                .with_drive("4x4")
                .with_cabin()
                .with_stock(false)
                .created(at(3)),
            Product::new(4, "Русич Т-50", "mini-tractors", 780_000)
                .with_slug("rusich-t-50")
                .with_manufacturer("Русич")
                .with_power("50 л.с.")
                .with_drive("4x4")
                .with_cabin()
                .featured()
                .new_arrival()
                .created(at(4)),
            Product::new(5, "Плуг ПН-1-20", "equipment", 18_000)
                .with_slug("plug-pn-1-20")
                .with_description("Плуг для мини-тракторов")
                .with_manufacturer("Уралец")
                .created(at(5)),
            Product::new(6, "Фреза ФН-1.2", "equipment", 42_000)
                .with_slug("freza-fn-1-2")
                .with_manufacturer("DongFeng")
                .created(at(6)),
            Product::new(7, "Jinma JM-354", "mini-tractors", 540_000)
                .with_slug("jinma-jm-354")
                .with_model("JM-354")
                .with_manufacturer("Jinma")
                .with_power("35,5 л.с.")
                .with_drive("4x2")
                .created(at(7)),
            Product::new(8, "Косилка КР-1", "equipment", 29_000)
                .with_slug("kosilka-kr-1")
                .with_manufacturer("Jinma")
                .with_stock(false)
                .created(at(8)),
        ]
    }

    /// Looks up a product of [`catalog`](Self::catalog) by id.
    pub fn from_catalog(id: u64) -> Product {
        Self::catalog()
            .into_iter()
            .find(|p| p.id == ProductId::new(id))
            .expect("fixture id exists")
    }

    /// An in-memory repository seeded with [`catalog`](Self::catalog).
    pub fn repository() -> Arc<InMemoryRepository> {
        Arc::new(InMemoryRepository::new(Self::catalog()))
    }

    /// A query engine over [`repository`](Self::repository).
    pub fn engine() -> CatalogQueryEngine {
        CatalogQueryEngine::new(Self::repository())
    }
}
