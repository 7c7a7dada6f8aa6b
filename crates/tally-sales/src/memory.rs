//! In-memory implementations of the store contracts.
//!
//! Each sale sits behind its own `tokio::sync::Mutex`; a unit of work holds
//! the owned guard from `begin` until it is committed or dropped, so two
//! mutations of the same sale are strictly serialized while different sales
//! proceed in parallel.
//!
//! [`MemorySaleStore::fail_next_commits`] injects transient `Busy` failures
//! to exercise the service's retry path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tally_core::{ProductSnapshot, SaleAggregate};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::{
    ProductCatalog, SaleStore, SaleUnitOfWork, StoreError, StoreResult,
};

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

// =============================================================================
// Sale Store
// =============================================================================

#[derive(Debug, Default)]
pub struct MemorySaleStore {
    sales: RwLock<HashMap<String, Arc<Mutex<SaleAggregate>>>>,
    faults: Arc<Faults>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_next_commits: AtomicU32,
    commits: AtomicU64,
}

impl MemorySaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` commits fail with [`StoreError::Busy`].
    pub fn fail_next_commits(&self, n: u32) {
        self.faults.fail_next_commits.store(n, Ordering::SeqCst);
    }

    /// Number of units of work committed successfully.
    pub fn commit_count(&self) -> u64 {
        self.faults.commits.load(Ordering::SeqCst)
    }

    fn slot(&self, sale_id: &str) -> StoreResult<Option<Arc<Mutex<SaleAggregate>>>> {
        let sales = self.sales.read().map_err(|_| poisoned())?;
        Ok(sales.get(sale_id).cloned())
    }
}

#[async_trait]
impl SaleStore for MemorySaleStore {
    async fn insert(&self, sale: &SaleAggregate) -> StoreResult<()> {
        let mut sales = self.sales.write().map_err(|_| poisoned())?;
        if sales.contains_key(sale.id()) {
            return Err(StoreError::Backend(format!("sale {} already exists", sale.id())));
        }
        sales.insert(sale.id().to_string(), Arc::new(Mutex::new(sale.clone())));
        Ok(())
    }

    async fn fetch(&self, sale_id: &str) -> StoreResult<Option<SaleAggregate>> {
        match self.slot(sale_id)? {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn begin(&self, sale_id: &str) -> StoreResult<Box<dyn SaleUnitOfWork>> {
        let guard = match self.slot(sale_id)? {
            Some(slot) => Some(slot.lock_owned().await),
            None => None,
        };

        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged: None,
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<SaleAggregate>>,
    staged: Option<SaleAggregate>,
    faults: Arc<Faults>,
}

#[async_trait]
impl SaleUnitOfWork for MemoryUnitOfWork {
    async fn load(&mut self) -> StoreResult<Option<SaleAggregate>> {
        Ok(self.guard.as_ref().map(|sale| (**sale).clone()))
    }

    async fn save(&mut self, sale: &SaleAggregate) -> StoreResult<()> {
        match &self.guard {
            Some(current) if current.id() == sale.id() => {
                self.staged = Some(sale.clone());
                Ok(())
            }
            _ => Err(StoreError::Backend(format!(
                "sale {} is not part of this unit of work",
                sale.id()
            ))),
        }
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        let injected = self
            .faults
            .fail_next_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Busy("injected failure".to_string()));
        }

        if let (Some(guard), Some(staged)) = (self.guard.as_mut(), self.staged.take()) {
            **guard = staged;
        }
        self.faults.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Product Catalog
// =============================================================================

/// Fixed product list keyed by product id.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<String, ProductSnapshot>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = ProductSnapshot>) -> Self {
        let catalog = Self::new();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    pub fn insert(&self, product: ProductSnapshot) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.product_id.clone(), product);
        }
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn find_product(&self, product_id: &str) -> StoreResult<Option<ProductSnapshot>> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tally_core::NewSale;
    use uuid::Uuid;

    fn sale() -> SaleAggregate {
        SaleAggregate::open(
            Uuid::new_v4(),
            NewSale {
                operator_id: "op-1".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemorySaleStore::new();
        let original = sale();
        store.insert(&original).await.unwrap();

        let mut uow = store.begin(original.id()).await.unwrap();
        let mut loaded = uow.load().await.unwrap().unwrap();
        loaded.cancel(Utc::now()).unwrap();
        uow.save(&loaded).await.unwrap();
        drop(uow);

        let fetched = store.fetch(original.id()).await.unwrap().unwrap();
        assert_eq!(fetched, original);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure_rolls_back() {
        let store = MemorySaleStore::new();
        let original = sale();
        store.insert(&original).await.unwrap();
        store.fail_next_commits(1);

        let mut uow = store.begin(original.id()).await.unwrap();
        let mut loaded = uow.load().await.unwrap().unwrap();
        loaded.cancel(Utc::now()).unwrap();
        uow.save(&loaded).await.unwrap();
        let err = uow.commit().await.unwrap_err();
        assert!(err.is_retryable());

        let fetched = store.fetch(original.id()).await.unwrap().unwrap();
        assert_eq!(fetched, original);
    }

    #[tokio::test]
    async fn test_unknown_sale_loads_none() {
        let store = MemorySaleStore::new();
        let mut uow = store.begin("missing").await.unwrap();
        assert!(uow.load().await.unwrap().is_none());
        assert!(store.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemorySaleStore::new();
        let original = sale();
        store.insert(&original).await.unwrap();
        assert!(store.insert(&original).await.is_err());
    }
}
