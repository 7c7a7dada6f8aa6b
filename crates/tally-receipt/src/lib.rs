//! # tally-receipt: PDF Receipts for Completed Sales
//!
//! ## Generation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  GET /sales/{id}/receipt                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleService::get_sale(id)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReceiptGenerator::generate(&sale)                                     │
//! │       │                                                                 │
//! │       ├── status != completed? → ReceiptError::InvalidState            │
//! │       │                                                                 │
//! │       ├── layout::receipt_lines   header, items, payments, summary     │
//! │       ├── layout::paginate        lines_per_page, "page n/m" footers   │
//! │       └── pdf::render             lopdf, Courier, 80 mm pages          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Receipt { mime_type: "application/pdf", content, size_bytes }         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Receipts are rebuilt on every request and never stored. The same sale and
//! options always yield byte-identical output.

pub mod layout;
pub mod pdf;

use serde::Deserialize;
use tally_core::{SaleAggregate, SaleStatus};
use thiserror::Error;
use tracing::debug;

/// MIME type of every generated receipt.
pub const RECEIPT_MIME_TYPE: &str = "application/pdf";

/// Receipt generation errors.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Only completed sales have receipts.
    #[error("Sale {sale_id} is {status}; receipts require a completed sale")]
    InvalidState { sale_id: String, status: SaleStatus },

    #[error("Invalid receipt options: {0}")]
    InvalidOptions(String),

    /// PDF encoding failed.
    #[error("Receipt rendering failed: {0}")]
    Render(String),
}

pub type ReceiptResult<T> = Result<T, ReceiptError>;

/// Store branding and page geometry. Deserialized from the `[receipt]`
/// config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReceiptOptions {
    pub store_name: String,
    pub address_lines: Vec<String>,
    /// Prefixed to summary totals, e.g. `$` or `R$ `.
    pub currency_symbol: String,
    /// Lines per page including the footer. At least 10.
    pub lines_per_page: usize,
}

impl Default for ReceiptOptions {
    fn default() -> Self {
        ReceiptOptions {
            store_name: "Tally POS".to_string(),
            address_lines: Vec::new(),
            currency_symbol: String::new(),
            lines_per_page: 60,
        }
    }
}

impl ReceiptOptions {
    pub fn validate(&self) -> ReceiptResult<()> {
        if self.lines_per_page < layout::MIN_LINES_PER_PAGE {
            return Err(ReceiptError::InvalidOptions(format!(
                "lines_per_page must be at least {}",
                layout::MIN_LINES_PER_PAGE
            )));
        }
        if self.currency_symbol.chars().count() > 4 {
            return Err(ReceiptError::InvalidOptions(
                "currency_symbol must be at most 4 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// A rendered receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub mime_type: &'static str,
    pub content: Vec<u8>,
    pub size_bytes: usize,
}

/// Stateless receipt renderer.
///
/// ## Example
/// ```rust,ignore
/// let generator = ReceiptGenerator::new(ReceiptOptions::default());
/// let receipt = generator.generate(&completed_sale)?;
/// assert!(receipt.content.starts_with(b"%PDF"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReceiptGenerator {
    options: ReceiptOptions,
}

impl ReceiptGenerator {
    pub fn new(options: ReceiptOptions) -> Self {
        ReceiptGenerator { options }
    }

    pub fn options(&self) -> &ReceiptOptions {
        &self.options
    }

    /// Renders the receipt for a completed sale.
    ///
    /// ## Errors
    /// - `InvalidState` unless the sale is completed
    /// - `InvalidOptions` for unusable page geometry
    /// - `Render` if PDF encoding fails
    pub fn generate(&self, sale: &SaleAggregate) -> ReceiptResult<Receipt> {
        if sale.status() != SaleStatus::Completed {
            return Err(ReceiptError::InvalidState {
                sale_id: sale.id().to_string(),
                status: sale.status(),
            });
        }
        self.options.validate()?;

        let lines = layout::receipt_lines(
            sale,
            layout::Header {
                store_name: &self.options.store_name,
                address_lines: &self.options.address_lines,
                currency_symbol: &self.options.currency_symbol,
            },
        );
        let pages = layout::paginate(lines, self.options.lines_per_page);
        let title = format!("Receipt {}", sale.sale().receipt_number);
        let content = pdf::render(&pages, self.options.lines_per_page, &title)?;

        debug!(
            sale_id = %sale.id(),
            pages = pages.len(),
            size_bytes = content.len(),
            "Receipt generated"
        );

        Ok(Receipt {
            mime_type: RECEIPT_MIME_TYPE,
            size_bytes: content.len(),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tally_core::{
        Money, NewPayment, NewSale, NewSaleItem, PaymentMethod, ProductSnapshot, Quantity, TaxRate,
    };
    use uuid::Uuid;

    fn product(n: usize) -> ProductSnapshot {
        ProductSnapshot {
            product_id: format!("p-{n}"),
            name: format!("Product number {n}"),
            sku: format!("SKU-{n}"),
            unit_label: "un".to_string(),
            unit_price: Money::from_cents(1000),
            tax_rate: TaxRate::zero(),
        }
    }

    fn sale_with_items(count: usize, finalize: bool) -> SaleAggregate {
        let at = Utc.with_ymd_and_hms(2026, 1, 18, 14, 2, 11).unwrap();
        let id = Uuid::parse_str("3f2a9c01-5b7e-4d1a-9c3e-0a1b2c3d4e5f").unwrap();
        let mut sale = SaleAggregate::open(
            id,
            NewSale {
                operator_id: "op-7".to_string(),
                ..Default::default()
            },
            at,
        )
        .unwrap();

        for n in 0..count {
            sale.add_item(NewSaleItem::new(product(n), Quantity::from_units(1)), at)
                .unwrap();
        }
        sale.add_payment(
            NewPayment {
                method: PaymentMethod::Cash,
                amount: Money::from_cents(1000 * count as i64 + 500),
                transaction_reference: Some("drawer-1".to_string()),
            },
            at,
        )
        .unwrap();
        if finalize {
            sale.finalize(at).unwrap();
        }
        sale
    }

    #[test]
    fn test_completed_sale_renders_pdf() {
        let generator = ReceiptGenerator::default();
        let receipt = generator.generate(&sale_with_items(2, true)).unwrap();

        assert_eq!(receipt.mime_type, "application/pdf");
        assert!(receipt.content.starts_with(b"%PDF"));
        assert_eq!(receipt.size_bytes, receipt.content.len());

        let doc = lopdf::Document::load_mem(&receipt.content).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let text = String::from_utf8_lossy(&receipt.content);
        assert!(text.contains("20260118-3F2A9C01"));
        assert!(text.contains("op-7"));
    }

    #[test]
    fn test_open_sale_is_rejected() {
        let generator = ReceiptGenerator::default();
        let err = generator.generate(&sale_with_items(1, false)).unwrap_err();
        assert!(matches!(
            err,
            ReceiptError::InvalidState {
                status: SaleStatus::PendingPayment,
                ..
            }
        ));
    }

    #[test]
    fn test_cancelled_sale_is_rejected() {
        let mut sale = sale_with_items(1, false);
        sale.cancel(Utc::now()).unwrap();
        let err = ReceiptGenerator::default().generate(&sale).unwrap_err();
        assert!(matches!(err, ReceiptError::InvalidState { .. }));
    }

    #[test]
    fn test_large_sale_paginates() {
        let generator = ReceiptGenerator::new(ReceiptOptions {
            lines_per_page: 20,
            ..Default::default()
        });
        let sale = sale_with_items(40, true);
        let receipt = generator.generate(&sale).unwrap();

        let doc = lopdf::Document::load_mem(&receipt.content).unwrap();
        let body = layout::receipt_lines(
            &sale,
            layout::Header {
                store_name: "Tally POS",
                address_lines: &[],
                currency_symbol: "",
            },
        );
        let expected_pages = body.len().div_ceil(19);
        assert!(expected_pages > 1);
        assert_eq!(doc.get_pages().len(), expected_pages);
    }

    #[test]
    fn test_output_is_deterministic() {
        let generator = ReceiptGenerator::default();
        let sale = sale_with_items(3, true);
        assert_eq!(
            generator.generate(&sale).unwrap(),
            generator.generate(&sale).unwrap()
        );
    }

    #[test]
    fn test_invalid_options() {
        let generator = ReceiptGenerator::new(ReceiptOptions {
            lines_per_page: 3,
            ..Default::default()
        });
        let err = generator.generate(&sale_with_items(1, true)).unwrap_err();
        assert!(matches!(err, ReceiptError::InvalidOptions(_)));
    }
}
