//! # tally-sales: Sale Lifecycle Service
//!
//! Opens, fills, pays and closes sales. Every mutation is one unit of work:
//! load the aggregate, apply exactly one `tally-core` operation, persist
//! header and appended rows atomically, return the refreshed aggregate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pos-api handlers                                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌──────────────────────── tally-sales ──────────────────────────┐    │
//! │   │  SaleService ──► Arc<dyn SaleStore>      (unit of work)       │    │
//! │   │             └──► Arc<dyn ProductCatalog> (product lookup)     │    │
//! │   │  MemorySaleStore / MemoryCatalog for tests                    │    │
//! │   └────────────────────────────────────────────────────────────────┘    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   tally-db: SqliteSaleStore, ProductRepository                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tally_core::NewSale;
//! use tally_sales::{MemoryCatalog, MemorySaleStore, SaleService, SaleServiceConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let service = SaleService::new(
//!     Arc::new(MemorySaleStore::new()),
//!     Arc::new(MemoryCatalog::new()),
//!     SaleServiceConfig::default(),
//! );
//! let sale = service
//!     .open_sale(NewSale { operator_id: "op-1".into(), ..Default::default() })
//!     .await
//!     .unwrap();
//! let done = service.finalize_sale(sale.id()).await.unwrap();
//! assert_eq!(done.sale().change_due.cents(), 0);
//! # });
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;

pub use config::SaleServiceConfig;
pub use error::{PosError, PosResult};
pub use memory::{MemoryCatalog, MemorySaleStore};
pub use service::{AddItemRequest, SaleService};
pub use store::{ProductCatalog, SaleStore, SaleUnitOfWork, StoreError, StoreResult};
