//! # tally-db: Database Layer for Tally POS
//!
//! SQLite persistence for products and sales.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         tally-db Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pos-api / seed binary                        │   │
//! │  └──────────────────────────────┬──────────────────────────────────┘   │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                       Database (pool.rs)                        │   │
//! │  │   ┌──────────────────┐    ┌──────────────────┐                  │   │
//! │  │   │ProductRepository │    │ SqliteSaleStore  │                  │   │
//! │  │   │ (ProductCatalog) │    │   (SaleStore)    │                  │   │
//! │  │   └────────┬─────────┘    └────────┬─────────┘                  │   │
//! │  └────────────┼───────────────────────┼────────────────────────────┘   │
//! │               └───────────┬───────────┘                                 │
//! │                           ▼                                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  SqlitePool (WAL mode)                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_db::{Database, DbConfig};
//! use tally_sales::{SaleService, SaleServiceConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let service = SaleService::new(
//!     Arc::new(db.sales()),
//!     Arc::new(db.products()),
//!     SaleServiceConfig::default(),
//! );
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::{SqliteSaleStore, SqliteUnitOfWork};
