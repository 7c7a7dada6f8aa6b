//! # tally-core: Pure Sale Lifecycle Logic for Tally POS
//!
//! This crate is the **heart** of Tally POS. It holds every rule about a
//! sale as plain data and pure functions, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pos-api (axum)                               │   │
//! │  │    POST /sales ─► /items ─► /payments ─► /finalize ─► /receipt  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-sales (SaleService)                       │   │
//! │  │        unit of work: load → mutate → commit, with retry         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   sale    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ Aggregate │  │   rules   │  │   │
//! │  │   │   Sale    │  │ Quantity  │  │  totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, SalePayment, ...)
//! - [`money`] - Money and Quantity with integer arithmetic
//! - [`sale`] - The sale aggregate and its state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tally_core::money::{Money, Quantity};
//! use tally_core::sale::{NewSale, NewSaleItem, SaleAggregate};
//! use tally_core::types::{ProductSnapshot, TaxRate};
//!
//! let mut sale = SaleAggregate::open(
//!     uuid::Uuid::new_v4(),
//!     NewSale { operator_id: "op-1".into(), ..Default::default() },
//!     Utc::now(),
//! )
//! .unwrap();
//!
//! let product = ProductSnapshot {
//!     product_id: "p-1".into(),
//!     name: "Espresso".into(),
//!     sku: "ESP".into(),
//!     unit_label: "un".into(),
//!     unit_price: Money::from_cents(450),
//!     tax_rate: TaxRate::zero(),
//! };
//! sale.add_item(NewSaleItem::new(product, Quantity::from_units(2)), Utc::now()).unwrap();
//!
//! assert_eq!(sale.sale().total_net.cents(), 900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Quantity, MAX_MONEY_CENTS};
pub use sale::{NewPayment, NewSale, NewSaleItem, SaleAggregate};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on a single sale.
pub const MAX_SALE_ITEMS: usize = 500;

/// Maximum quantity on a single line, in milli-units (99 999.999).
pub const MAX_ITEM_QUANTITY_MILLI: i64 = 99_999_999;
