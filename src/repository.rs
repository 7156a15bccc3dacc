//! Product store trait for abstracting product persistence.
//!
//! The invoice core only reads products. Implement [`ProductStore`] for any
//! backend (SQL, key-value, remote service); [`InMemoryProductStore`] backs
//! the bundled server and the tests.

use crate::entity::{ProductId, ProductRecord};
use crate::error::Result;
use std::collections::BTreeMap;
use std::future::Future;

/// Trait for product store implementations.
///
/// Futures are `Send` so stores can be used from multi-threaded HTTP handlers.
/// Implementations may use `async fn` directly.
pub trait ProductStore: Send + Sync {
    /// Fetch a product by ID.
    ///
    /// # Returns
    /// - `Ok(Some(product))` - Product found
    /// - `Ok(None)` - Product not found (not an error)
    /// - `Err(e)` - Store error
    fn fetch_by_id(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<ProductRecord>>> + Send;

    /// Fetch every product, ordered by ID.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<ProductRecord>>> + Send;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory product store ordered by ID.
///
/// Populated during startup, then shared read-only.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProductStore {
    data: BTreeMap<ProductId, ProductRecord>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        InMemoryProductStore {
            data: BTreeMap::new(),
        }
    }

    /// Insert or replace a product under its own ID.
    pub fn insert(&mut self, product: ProductRecord) {
        self.data.insert(product.id, product);
    }

    /// Insert a product under the next free ID (starting at 1).
    pub fn push(&mut self, name: impl Into<String>, amount: i32) -> ProductRecord {
        let id = self.data.keys().next_back().map_or(1, |last| last + 1);
        let product = ProductRecord::new(id, name, amount);
        self.data.insert(id, product.clone());
        product
    }

    /// Store seeded with the demo catalogue served by `invoice-server`.
    pub fn with_demo_catalogue() -> Self {
        let mut store = InMemoryProductStore::new();
        for (name, amount) in [
            ("Item 1", 11),
            ("Item 2", 18),
            ("Item 3", 45),
            ("Item 4", 9),
            ("Item 5", 1),
        ] {
            store.push(name, amount);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl FromIterator<ProductRecord> for InMemoryProductStore {
    fn from_iter<I: IntoIterator<Item = ProductRecord>>(iter: I) -> Self {
        let mut store = InMemoryProductStore::new();
        for product in iter {
            store.insert(product);
        }
        store
    }
}

impl ProductStore for InMemoryProductStore {
    async fn fetch_by_id(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.data.get(&id).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<ProductRecord>> {
        Ok(self.data.values().cloned().collect())
    }
}
