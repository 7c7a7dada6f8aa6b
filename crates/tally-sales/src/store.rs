//! # Store Contracts
//!
//! The seams between the sale service and its collaborators. Production
//! wires SQLite implementations from `tally-db`; tests use [`crate::memory`].
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   store.begin(sale_id) ──► uow                                          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   uow.load()            fresh aggregate, read inside the transaction    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   (mutate in memory)    rule violation? drop uow → rolled back          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   uow.save(&sale)       header + new items/payments, version checked    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   uow.commit()          all or nothing                                  │
//! │                                                                         │
//! │  Two units of work on the same sale never interleave: the second one   │
//! │  either waits (lock) or fails with Busy/Conflict and is retried.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use tally_core::{ProductSnapshot, SaleAggregate};
use thiserror::Error;

/// Persistence failures, as seen by the service.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Lock wait exceeded the busy timeout.
    #[error("store busy: {0}")]
    Busy(String),

    /// Another writer committed first (optimistic version mismatch).
    #[error("concurrent modification of sale {sale_id}")]
    Conflict { sale_id: String },

    /// The store refused the write outright (constraint violation).
    /// Repeating the same write fails the same way.
    #[error("write rejected: {0}")]
    Rejected(String),

    /// Anything else: connection loss, corrupt row.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// Busy and Conflict are the only failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Busy(_) | StoreError::Conflict { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional sale persistence.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Persists a freshly opened sale.
    async fn insert(&self, sale: &SaleAggregate) -> StoreResult<()>;

    /// Reads a sale with its items and payments, outside any transaction.
    async fn fetch(&self, sale_id: &str) -> StoreResult<Option<SaleAggregate>>;

    /// Starts a unit of work scoped to one sale.
    async fn begin(&self, sale_id: &str) -> StoreResult<Box<dyn SaleUnitOfWork>>;
}

/// One atomic read-modify-write of a single sale.
///
/// Dropping a unit of work without calling [`commit`](Self::commit)
/// discards everything it staged.
#[async_trait]
pub trait SaleUnitOfWork: Send {
    /// Loads the sale as seen by this unit of work. `None` if it does not exist.
    async fn load(&mut self) -> StoreResult<Option<SaleAggregate>>;

    /// Stages the mutated aggregate: header totals/status plus any items and
    /// payments appended since [`load`](Self::load).
    async fn save(&mut self, sale: &SaleAggregate) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Product lookup collaborator.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolves an active product. Inactive or unknown products are `None`.
    async fn find_product(&self, product_id: &str) -> StoreResult<Option<ProductSnapshot>>;
}
