//! Resolves requested product IDs into an invoice.

use crate::entity::{InvoiceResult, ProductId, ProductRecord};
use crate::error::{Error, Result};
use crate::repository::ProductStore;
use std::sync::Arc;

/// Looks up product IDs in a [`ProductStore`] and totals them.
///
/// Read-only: never writes to the store and never touches the PDF cache.
pub struct ProductAggregator<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> ProductAggregator<S> {
    pub fn new(store: S) -> Self {
        ProductAggregator {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        ProductAggregator { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `ids` in order.
    ///
    /// Stops at the first unknown ID and returns `Error::ProductNotFound` for
    /// it; IDs after that one are never looked up.
    ///
    /// # Errors
    ///
    /// - `Error::ProductNotFound`: an ID is not in the store
    /// - `Error::Store`: the store failed
    pub async fn resolve(&self, ids: &[ProductId]) -> Result<InvoiceResult> {
        let mut entities: Vec<ProductRecord> = Vec::with_capacity(ids.len());

        for &id in ids {
            match self.store.fetch_by_id(id).await? {
                Some(product) => entities.push(product),
                None => {
                    debug!("Product {} not found, aborting invoice", id);
                    return Err(Error::ProductNotFound(id));
                }
            }
        }

        let invoice = InvoiceResult::from_entities(entities);
        debug!(
            "Resolved {} products, total sum {}",
            invoice.len(),
            invoice.total_sum
        );
        Ok(invoice)
    }
}

impl<S: ProductStore> Clone for ProductAggregator<S> {
    fn clone(&self) -> Self {
        ProductAggregator {
            store: Arc::clone(&self.store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryProductStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn catalogue() -> InMemoryProductStore {
        vec![
            ProductRecord::new(1, "ItemA", 7),
            ProductRecord::new(2, "ItemB", 14),
            ProductRecord::new(3, "ItemC", 9),
        ]
        .into_iter()
        .collect()
    }

    /// Store that counts lookups, to observe fail-fast behavior.
    struct CountingStore {
        inner: InMemoryProductStore,
        lookups: AtomicUsize,
    }

    impl ProductStore for CountingStore {
        async fn fetch_by_id(&self, id: ProductId) -> Result<Option<ProductRecord>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_by_id(id).await
        }

        async fn fetch_all(&self) -> Result<Vec<ProductRecord>> {
            self.inner.fetch_all().await
        }
    }

    struct BrokenStore;

    impl ProductStore for BrokenStore {
        async fn fetch_by_id(&self, _id: ProductId) -> Result<Option<ProductRecord>> {
            Err(Error::Store("connection refused".to_string()))
        }

        async fn fetch_all(&self) -> Result<Vec<ProductRecord>> {
            Err(Error::Store("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_resolve_preserves_request_order() {
        let aggregator = ProductAggregator::new(catalogue());
        let invoice = aggregator.resolve(&[3, 1, 3]).await.expect("resolve");

        let names: Vec<&str> = invoice.entities.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ItemC", "ItemA", "ItemC"]);
        assert_eq!(invoice.total_sum, 25);
    }

    #[tokio::test]
    async fn test_resolve_fails_fast_on_first_missing() {
        let store = CountingStore {
            inner: catalogue(),
            lookups: AtomicUsize::new(0),
        };
        let aggregator = ProductAggregator::new(store);

        let err = aggregator
            .resolve(&[1, 8, 9, 2])
            .await
            .expect_err("missing product");
        assert_eq!(err, Error::ProductNotFound(8));
        assert_eq!(aggregator.store().lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_empty_request() {
        let aggregator = ProductAggregator::new(catalogue());
        let invoice = aggregator.resolve(&[]).await.expect("resolve");
        assert!(invoice.is_empty());
        assert_eq!(invoice.total_sum, 0);
    }

    #[tokio::test]
    async fn test_resolve_propagates_store_errors() {
        let aggregator = ProductAggregator::new(BrokenStore);
        let err = aggregator.resolve(&[1]).await.expect_err("store error");
        assert!(matches!(err, Error::Store(_)));
    }
}
