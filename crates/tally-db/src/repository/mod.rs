//! # Repository Module
//!
//! SQLite-backed implementations of the sale service's collaborators.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleService (tally-sales)                                             │
//! │       │                          │                                      │
//! │       │ ProductCatalog           │ SaleStore / SaleUnitOfWork           │
//! │       ▼                          ▼                                      │
//! │  ProductRepository          SqliteSaleStore                            │
//! │  ├── insert / set_active    ├── insert                                 │
//! │  ├── get_by_id / get_by_sku ├── fetch                                  │
//! │  └── list_active            └── begin → SqliteUnitOfWork               │
//! │       │                          │                                      │
//! │       ▼                          ▼                                      │
//! │  products                   sales, sale_items, sale_payments           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod product;
pub mod sale;
