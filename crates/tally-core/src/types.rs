//! # Domain Types
//!
//! Value types shared by every Tally POS crate.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  SalePayment    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  receipt_number │   │  sale_id (FK)   │       │
//! │  │  unit_label     │   │  status         │   │  sequence       │       │
//! │  │  price_cents    │   │  total_* (Money)│   │  method, amount │       │
//! │  └────────┬────────┘   └────────┬────────┘   └─────────────────┘       │
//! │           │ snapshot()          │ 1..N                                  │
//! │  ┌────────▼────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │ProductSnapshot  │──►│    SaleItem     │   │ PaymentMethod   │       │
//! │  │  name, sku,     │   │  frozen copy of │   │  cash, debit,   │       │
//! │  │  unit, price,   │   │  the snapshot + │   │  credit, pix,   │       │
//! │  │  tax rate       │   │  line totals    │   │  voucher, ...   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business ID: (sku, receipt_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18.00%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle state of a sale.
///
/// ## State Machine
/// ```text
///                add_payment
///   ┌──────┐ ─────────────────► ┌─────────────────┐
///   │ Open │                    │ PendingPayment  │
///   └──┬───┘                    └───────┬─────────┘
///      │ finalize / cancel              │ finalize / cancel
///      ▼                                ▼
///   ┌───────────┐  ┌───────────┐
///   │ Completed │  │ Cancelled │   (terminal)
///   └───────────┘  └───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Freshly opened, items and payments accepted.
    Open,
    /// At least one payment recorded; still accepts items and payments.
    PendingPayment,
    /// Finalized. Terminal.
    Completed,
    /// Abandoned before completion. Terminal.
    Cancelled,
}

impl SaleStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [SaleStatus; 4] = [
        SaleStatus::Open,
        SaleStatus::PendingPayment,
        SaleStatus::Completed,
        SaleStatus::Cancelled,
    ];

    /// Whether items and payments may still be appended.
    #[inline]
    pub const fn is_mutable(&self) -> bool {
        matches!(self, SaleStatus::Open | SaleStatus::PendingPayment)
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !self.is_mutable()
    }

    /// Wire/storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Open => "open",
            SaleStatus::PendingPayment => "pending_payment",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Open
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaleStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: SaleStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Debit card on an external terminal.
    Debit,
    /// Credit card on an external terminal.
    Credit,
    /// Instant bank transfer by QR code.
    Pix,
    /// Meal or gift voucher.
    Voucher,
    /// Regular bank transfer.
    Transfer,
    Other,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::Cash,
        PaymentMethod::Debit,
        PaymentMethod::Credit,
        PaymentMethod::Pix,
        PaymentMethod::Voucher,
        PaymentMethod::Transfer,
        PaymentMethod::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Voucher => "voucher",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the wire name, case-insensitively.
///
/// ## Example
/// ```rust
/// use tally_core::types::PaymentMethod;
///
/// assert_eq!("PIX".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pix);
/// assert!("cheque".parse::<PaymentMethod>().is_err());
/// ```
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: PaymentMethod::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Unit of measure printed next to quantities ("un", "kg", "m").
    pub unit_label: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bps: u32,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Freezes the fields a sale line needs.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id.clone(),
            name: self.name.clone(),
            sku: self.sku.clone(),
            unit_label: self.unit_label.clone(),
            unit_price: self.price(),
            tax_rate: self.tax_rate(),
        }
    }
}

/// What the product lookup hands to the sale: identity and current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub unit_label: String,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
}

// =============================================================================
// Customer
// =============================================================================

/// Optional customer identification captured when a sale is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInfo {
    pub name: Option<String>,
    /// Tax identifier (CPF/CNPJ, VAT number, ...). Stored as given.
    pub tax_id: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header. Totals are always derived from the item and payment logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `YYYYMMDD-XXXXXXXX`, printed on the receipt.
    pub receipt_number: String,
    pub status: SaleStatus,
    pub operator_id: String,
    pub customer_name: Option<String>,
    pub customer_tax_id: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub total_gross: Money,
    pub total_discount: Money,
    pub total_tax: Money,
    pub total_net: Money,
    pub total_paid: Money,
    /// Zero until finalize, frozen afterwards.
    pub change_due: Money,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Amount still owed: `max(0, net - paid)`.
    pub fn balance_due(&self) -> Money {
        (self.total_net - self.total_paid).clamp_non_negative()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// 1-based position within the sale.
    pub sequence: i64,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// SKU at time of sale (frozen).
    pub sku: String,
    pub unit_label: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub discount_value: Money,
    pub tax_value: Money,
    /// `quantity × unit_price`, rounded half-up.
    pub gross_total: Money,
    /// `gross_total - discount_value + tax_value`, never negative.
    pub net_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Payment
// =============================================================================

/// A payment towards a sale.
/// A sale can have multiple payments for split tender scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub sale_id: String,
    pub sequence: i64,
    pub method: PaymentMethod,
    pub amount: Money,
    /// External reference (card auth code, PIX end-to-end id, ...).
    pub transaction_reference: Option<String>,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
