//! # storefront-catalog
//!
//! Catalog query engine for the storefront.
//!
//! This crate turns a declarative [`FilterState`] into a bounded,
//! paginated product list:
//!
//! - **Product Model**: Products as supplied by the repository
//! - **Filter State**: Immutable search / filter / sort / page parameters
//! - **Query Pipeline**: Pure filter → sort → paginate over a product slice
//! - **Repository Seam**: The async data source and an in-memory implementation
//! - **Query Engine**: Validation, fetch, pipeline, logging and metrics
//!
//! ## Example
//!
//! ```rust
//! use storefront_catalog::{FilterState, Product, SortKey, query};
//!
//! let products = vec![
//!     Product::new(1, "DF-244", "mini-tractors", 450_000),
//!     Product::new(2, "Плуг", "equipment", 38_000),
//!     Product::new(3, "LOVOL TE-504", "mini-tractors", 1_150_000),
//! ];
//!
//! let filter = FilterState::new(1)
//!     .with_category("mini-tractors")
//!     .sorted_by(SortKey::PriceAsc);
//! let page = query(&products, &filter).unwrap();
//!
//! assert_eq!(page.items[0].name, "DF-244");
//! assert_eq!(page.total_matched, 2);
//! assert!(page.has_more);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod filter;
pub mod product;
pub mod query;
pub mod repository;

// Re-export main types at crate root
pub use engine::CatalogQueryEngine;
pub use filter::{FilterState, PowerBucket, QueryLimits, SortKey};
pub use product::{Product, ProductId, parse_power};
pub use query::{QueryResult, query, query_with_limits};
pub use repository::{InMemoryRepository, ProductRepository};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::engine::CatalogQueryEngine;
    pub use crate::filter::{FilterState, PowerBucket, SortKey};
    pub use crate::product::{Product, ProductId};
    pub use crate::query::QueryResult;
    pub use crate::repository::{InMemoryRepository, ProductRepository};
}
