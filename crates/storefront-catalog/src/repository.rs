//! Product repository seam.
//!
//! The repository is the catalog's only data source and the only step of a
//! query that may suspend. The engine treats it as read-only and never
//! retries a failed fetch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use storefront_core::{Error, Result};

use crate::product::{Product, ProductId};

/// Read-only source of catalog products.
#[async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    /// Returns every product, in repository order.
    ///
    /// # Errors
    ///
    /// Returns `Error::RepositoryUnavailable` if the source cannot be reached.
    async fn all_products(&self) -> Result<Vec<Product>>;

    /// Returns the products with the given ids, in the order of `ids`.
    ///
    /// Ids the repository doesn't know are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::RepositoryUnavailable` if the source cannot be reached.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut by_id: HashMap<ProductId, Product> = self
            .all_products()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

/// In-memory product repository.
///
/// Cloning yields another handle onto the same product list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    products: Arc<RwLock<Vec<Product>>>,
}

impl InMemoryRepository {
    /// Creates a repository holding `products`.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Loads a repository from a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns `Error::RepositoryUnavailable` if the document is not a
    /// product array.
    pub fn from_json(raw: &str) -> Result<Self> {
        let products: Vec<Product> = serde_json::from_str(raw)
            .map_err(|e| Error::repository_with_source("invalid product document", e))?;
        Ok(Self::new(products))
    }

    /// Inserts `product`, replacing any product with the same id in place.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the lock is poisoned.
    pub fn upsert(&self, product: Product) -> Result<()> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        Ok(())
    }

    /// Removes the product with `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the lock is poisoned.
    pub fn remove(&self, id: ProductId) -> Result<()> {
        self.products
            .write()
            .map_err(|_| poisoned())?
            .retain(|p| p.id != id);
        Ok(())
    }

    /// Returns the number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.read().map_or(0, |p| p.len())
    }

    /// Returns true if the repository holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn all_products(&self) -> Result<Vec<Product>> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_products_by_ids_follows_requested_order() {
        let repo = InMemoryRepository::new(vec![
            Product::new(1, "a", "c", 10),
            Product::new(2, "b", "c", 20),
            Product::new(3, "c", "c", 30),
        ]);
        let found = repo
            .products_by_ids(&[ProductId::new(3), ProductId::new(9), ProductId::new(1)])
            .await
            .expect("lookup");
        let ids: Vec<u64> = found.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let repo = InMemoryRepository::new(vec![
            Product::new(1, "a", "c", 10),
            Product::new(2, "b", "c", 20),
        ]);
        repo.upsert(Product::new(1, "a2", "c", 15)).expect("upsert");
        repo.upsert(Product::new(3, "c", "c", 30)).expect("upsert");

        let all = repo.all_products().await.expect("all");
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a2", "b", "c"]);
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        let err = InMemoryRepository::from_json(r#"{"products":[]}"#).unwrap_err();
        assert!(matches!(err, Error::RepositoryUnavailable { .. }));
    }

    #[test]
    fn test_from_json_loads_products() {
        let repo = InMemoryRepository::from_json(
            r#"[{"id":1,"name":"DF-244","slug":"df-244","category":"mini-tractors","price":450000,"power":"24 л.с."}]"#,
        )
        .expect("load");
        assert_eq!(repo.len(), 1);
    }
}
