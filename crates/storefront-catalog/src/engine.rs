//! Catalog query engine.
//!
//! Binds the pure pipeline in [`crate::query`] to a [`ProductRepository`].
//! The engine owns no state between calls: each execution validates the
//! request, fetches, runs the pipeline and returns a fresh result.

use std::sync::Arc;

use tracing::Instrument;

use storefront_core::metrics;
use storefront_core::observability::catalog_span;
use storefront_core::{Error, Result};

use crate::filter::{FilterState, QueryLimits};
use crate::product::{Product, ProductId};
use crate::query::{QueryResult, query_with_limits};
use crate::repository::ProductRepository;

/// Executes catalog queries against a repository.
#[derive(Clone)]
pub struct CatalogQueryEngine {
    repository: Arc<dyn ProductRepository>,
    limits: QueryLimits,
}

impl std::fmt::Debug for CatalogQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogQueryEngine")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl CatalogQueryEngine {
    /// Creates an engine with the default limits.
    #[must_use]
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self::with_limits(repository, QueryLimits::default())
    }

    /// Creates an engine with explicit limits.
    #[must_use]
    pub fn with_limits(repository: Arc<dyn ProductRepository>, limits: QueryLimits) -> Self {
        Self { repository, limits }
    }

    /// Returns the limits enforced on incoming filter states.
    #[must_use]
    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Runs one query.
    ///
    /// The request is validated before the repository is contacted.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidQueryRequest` if `filter` violates the contract
    /// - `Error::RepositoryUnavailable` if the fetch fails; an unreachable
    ///   repository is never reported as an empty result
    pub async fn execute(&self, filter: &FilterState) -> Result<QueryResult<Product>> {
        let span = catalog_span("query", filter.sort_key().as_str());
        async {
            if let Err(e) = filter.validate(&self.limits) {
                tracing::warn!(error = %e, "rejected catalog query");
                metrics::record_catalog_query("invalid", None);
                return Err(e);
            }

            let products = match self.repository.all_products().await {
                Ok(products) => products,
                Err(e) => {
                    tracing::error!(error = %e, "product repository unavailable");
                    metrics::record_catalog_query("unavailable", None);
                    return Err(into_repository_error(e));
                }
            };

            let result = query_with_limits(&products, filter, &self.limits)?;
            tracing::debug!(
                total_matched = result.total_matched,
                returned = result.items.len(),
                offset = filter.page_offset(),
                "catalog query complete"
            );
            metrics::record_catalog_query("ok", Some(result.total_matched));
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Resolves products by id, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `Error::RepositoryUnavailable` if the fetch fails.
    pub async fn lookup(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        self.repository
            .products_by_ids(ids)
            .await
            .map_err(into_repository_error)
    }
}

/// Normalizes whatever the repository returned into `RepositoryUnavailable`.
fn into_repository_error(error: Error) -> Error {
    match error {
        e @ Error::RepositoryUnavailable { .. } => e,
        other => Error::repository_with_source("product fetch failed", other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::repository::InMemoryRepository;

    #[derive(Default)]
    struct CountingRepository {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ProductRepository for CountingRepository {
        async fn all_products(&self) -> Result<Vec<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::storage("socket closed"));
            }
            Ok(vec![Product::new(1, "DF-244", "mini-tractors", 450_000)])
        }
    }

    #[tokio::test]
    async fn test_execute_runs_pipeline() {
        let repo = InMemoryRepository::new(vec![
            Product::new(1, "a", "x", 30),
            Product::new(2, "b", "y", 10),
            Product::new(3, "c", "x", 20),
        ]);
        let engine = CatalogQueryEngine::new(Arc::new(repo));
        let result = engine
            .execute(
                &FilterState::new(10)
                    .with_category("x")
                    .sorted_by(crate::SortKey::PriceAsc),
            )
            .await
            .expect("query");
        let ids: Vec<u64> = result.items.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_invalid_request_skips_repository() {
        let repo = Arc::new(CountingRepository::default());
        let engine = CatalogQueryEngine::new(repo.clone());

        let err = engine.execute(&FilterState::new(0)).await.unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repository_failure_is_surfaced_not_empty() {
        let repo = Arc::new(CountingRepository {
            fail: true,
            ..CountingRepository::default()
        });
        let engine = CatalogQueryEngine::new(repo.clone());

        let err = engine.execute(&FilterState::new(10)).await.unwrap_err();
        assert!(matches!(err, Error::RepositoryUnavailable { .. }));
        assert!(!err.is_contract_violation());
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1, "no retry");
    }

    #[tokio::test]
    async fn test_engine_limits_come_from_config() {
        let config = storefront_core::StorefrontConfig {
            max_page_size: 5,
            ..storefront_core::StorefrontConfig::default()
        };
        let engine = CatalogQueryEngine::with_limits(
            Arc::new(InMemoryRepository::default()),
            QueryLimits::from(&config),
        );
        assert!(engine.execute(&FilterState::new(6)).await.is_err());
        assert!(engine.execute(&FilterState::new(5)).await.is_ok());
    }
}
