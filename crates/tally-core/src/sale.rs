//! # Sale Aggregate
//!
//! The sale header plus its append-only item and payment logs. Every rule
//! about what a sale may do lives here; callers only decide *when* to run
//! a mutation and how to persist the result.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open()                                                                 │
//! │    │  status = open, totals = 0, opened_at = now                        │
//! │    ▼                                                                    │
//! │  add_item() ──► snapshot product, compute line, recompute totals        │
//! │    │                                                                    │
//! │  add_payment() ─► append payment, recompute paid, open → pending        │
//! │    │                                                                    │
//! │    ├── finalize()  paid >= net ? completed, change frozen              │
//! │    │                          : InsufficientPayment (nothing changes)   │
//! │    └── cancel()    cancelled                                            │
//! │                                                                         │
//! │  completed / cancelled: every further mutation → InvalidSaleStatus     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! item.gross = round_half_up(unit_price × quantity)
//! item.net   = gross - discount + tax            (discount capped at gross + tax)
//!
//! total_gross    = Σ item.gross
//! total_discount = Σ item.discount
//! total_tax      = Σ item.tax
//! total_net      = Σ item.net  = max(0, gross - discount + tax)
//! total_paid     = Σ payment.amount
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Quantity};
use crate::types::{
    CustomerInfo, PaymentMethod, ProductSnapshot, Sale, SaleItem, SalePayment, SaleStatus,
};
use crate::validation;
use crate::MAX_SALE_ITEMS;

// =============================================================================
// Inputs
// =============================================================================

/// Caller input for opening a sale.
#[derive(Debug, Clone, Default)]
pub struct NewSale {
    pub operator_id: String,
    pub customer: CustomerInfo,
    pub notes: Option<String>,
}

/// Caller input for one line item.
#[derive(Debug, Clone)]
pub struct NewSaleItem {
    /// Identity and current price from the product lookup.
    pub product: ProductSnapshot,
    pub quantity: Quantity,
    /// Replaces the catalog price when present.
    pub unit_price: Option<Money>,
    pub discount_value: Option<Money>,
    pub tax_value: Option<Money>,
    /// Derive tax from the product's rate when `tax_value` is absent.
    pub derive_tax_from_catalog: bool,
}

impl NewSaleItem {
    /// A plain line at catalog price with no discount or tax.
    pub fn new(product: ProductSnapshot, quantity: Quantity) -> Self {
        NewSaleItem {
            product,
            quantity,
            unit_price: None,
            discount_value: None,
            tax_value: None,
            derive_tax_from_catalog: false,
        }
    }
}

/// Caller input for one payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub method: PaymentMethod,
    pub amount: Money,
    pub transaction_reference: Option<String>,
}

// =============================================================================
// Aggregate
// =============================================================================

/// A sale with its full item and payment history.
///
/// Fields are private: the only way to change a sale is through the
/// operations below, which keep the header totals in step with the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleAggregate {
    sale: Sale,
    items: Vec<SaleItem>,
    payments: Vec<SalePayment>,
}

impl SaleAggregate {
    /// Opens a new sale with zero totals.
    ///
    /// ## Errors
    /// - `Validation` for a blank/oversized operator id, oversized customer
    ///   fields or a malformed email
    pub fn open(id: Uuid, input: NewSale, now: DateTime<Utc>) -> CoreResult<Self> {
        let operator_id = validation::validate_operator_id(&input.operator_id)?;
        let customer = validation::validate_customer(&input.customer)?;
        let notes = validation::validate_notes(input.notes.as_deref())?;

        let simple = id.simple().to_string().to_ascii_uppercase();
        let receipt_number = format!("{}-{}", now.format("%Y%m%d"), &simple[..8]);

        let sale = Sale {
            id: id.to_string(),
            receipt_number,
            status: SaleStatus::Open,
            operator_id,
            customer_name: customer.name,
            customer_tax_id: customer.tax_id,
            customer_email: customer.email,
            notes,
            total_gross: Money::zero(),
            total_discount: Money::zero(),
            total_tax: Money::zero(),
            total_net: Money::zero(),
            total_paid: Money::zero(),
            change_due: Money::zero(),
            opened_at: now,
            closed_at: None,
        };

        Ok(SaleAggregate {
            sale,
            items: Vec::new(),
            payments: Vec::new(),
        })
    }

    /// Rebuilds an aggregate from persisted rows.
    ///
    /// Logs are ordered by sequence and the derived totals recomputed; a
    /// header that disagrees with its own logs is logged and corrected.
    pub fn from_parts(sale: Sale, mut items: Vec<SaleItem>, mut payments: Vec<SalePayment>) -> Self {
        items.sort_by_key(|item| item.sequence);
        payments.sort_by_key(|payment| payment.sequence);

        let stored = sale.clone();
        let mut aggregate = SaleAggregate {
            sale,
            items,
            payments,
        };
        if let Err(err) = aggregate.recompute() {
            warn!(
                sale_id = %stored.id,
                error = %err,
                "Stored sale logs exceed the money range; keeping stored totals"
            );
            return aggregate;
        }

        if aggregate.sale != stored {
            warn!(
                sale_id = %stored.id,
                stored_net = %stored.total_net,
                computed_net = %aggregate.sale.total_net,
                stored_paid = %stored.total_paid,
                computed_paid = %aggregate.sale.total_paid,
                "Stored sale totals drifted from item/payment logs; using recomputed values"
            );
        }

        aggregate
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn sale(&self) -> &Sale {
        &self.sale
    }

    pub fn id(&self) -> &str {
        &self.sale.id
    }

    pub fn status(&self) -> SaleStatus {
        self.sale.status
    }

    /// Items in creation order.
    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    /// Payments in creation order.
    pub fn payments(&self) -> &[SalePayment] {
        &self.payments
    }

    /// Amount still owed: `max(0, net - paid)`.
    pub fn balance_due(&self) -> Money {
        self.sale.balance_due()
    }

    pub fn into_parts(self) -> (Sale, Vec<SaleItem>, Vec<SalePayment>) {
        (self.sale, self.items, self.payments)
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    fn ensure_mutable(&self, operation: &'static str) -> CoreResult<()> {
        if self.sale.status.is_mutable() {
            return Ok(());
        }
        Err(CoreError::InvalidSaleStatus {
            sale_id: self.sale.id.clone(),
            status: self.sale.status,
            operation,
        })
    }

    /// Appends a line item and recomputes the totals.
    ///
    /// ## Line Computation
    /// ```text
    /// unit_price = override ?? catalog price
    /// gross      = round_half_up(unit_price × quantity)
    /// tax        = given ?? (derive ? rate × (gross - discount) : 0)
    /// discount   = min(discount, gross + tax)     ← clamp, logged
    /// net        = gross - discount + tax          (>= 0)
    /// ```
    ///
    /// ## Errors
    /// - `InvalidSaleStatus` if the sale is completed or cancelled
    /// - `SaleTooLarge` past `MAX_SALE_ITEMS`
    /// - `Validation` for a non-positive/oversized quantity, negative money,
    ///   or a line or sale total past `MAX_MONEY_CENTS` (sale left unchanged)
    pub fn add_item(&mut self, input: NewSaleItem, now: DateTime<Utc>) -> CoreResult<&SaleItem> {
        self.ensure_mutable("add item")?;

        if self.items.len() >= MAX_SALE_ITEMS {
            return Err(CoreError::SaleTooLarge {
                max: MAX_SALE_ITEMS,
            });
        }

        validation::validate_quantity(input.quantity)?;
        let unit_price = input.unit_price.unwrap_or(input.product.unit_price);
        validation::validate_non_negative("unit_price", unit_price)?;
        let requested_discount = input.discount_value.unwrap_or_default();
        validation::validate_non_negative("discount_value", requested_discount)?;
        if let Some(tax) = input.tax_value {
            validation::validate_non_negative("tax_value", tax)?;
        }

        let gross = unit_price.times_quantity(input.quantity)?;

        let tax = match input.tax_value {
            Some(tax) => tax,
            None if input.derive_tax_from_catalog => {
                let taxable = (gross - requested_discount).clamp_non_negative();
                taxable.calculate_tax(input.product.tax_rate)?
            }
            None => Money::zero(),
        };

        let ceiling = gross.checked_add(tax, "net_total")?;
        let discount = if requested_discount > ceiling {
            warn!(
                sale_id = %self.sale.id,
                product_id = %input.product.product_id,
                requested = %requested_discount,
                applied = %ceiling,
                "Discount exceeds line value; clamping net total to zero"
            );
            ceiling
        } else {
            requested_discount
        };

        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: self.sale.id.clone(),
            sequence: self.items.len() as i64 + 1,
            product_id: input.product.product_id,
            product_name: input.product.name,
            sku: input.product.sku,
            unit_label: input.product.unit_label,
            quantity: input.quantity,
            unit_price,
            discount_value: discount,
            tax_value: tax,
            gross_total: gross,
            net_total: gross - discount + tax,
            created_at: now,
        };

        self.items.push(item);
        if let Err(err) = self.recompute() {
            self.items.pop();
            return Err(err);
        }

        Ok(&self.items[self.items.len() - 1])
    }

    /// Appends a payment, recomputes `total_paid` and moves an open sale to
    /// pending payment. Over-payment is accepted; the surplus becomes change
    /// at finalize.
    ///
    /// ## Errors
    /// - `InvalidSaleStatus` if the sale is completed or cancelled
    /// - `Validation` for a non-positive amount, an oversized reference, or a
    ///   `total_paid` past `MAX_MONEY_CENTS` (sale left unchanged)
    pub fn add_payment(
        &mut self,
        input: NewPayment,
        now: DateTime<Utc>,
    ) -> CoreResult<&SalePayment> {
        self.ensure_mutable("add payment")?;

        validation::validate_payment_amount(input.amount)?;
        let transaction_reference =
            validation::validate_reference(input.transaction_reference.as_deref())?;

        let payment = SalePayment {
            id: Uuid::new_v4().to_string(),
            sale_id: self.sale.id.clone(),
            sequence: self.payments.len() as i64 + 1,
            method: input.method,
            amount: input.amount,
            transaction_reference,
            paid_at: now,
        };

        self.payments.push(payment);
        if let Err(err) = self.recompute() {
            self.payments.pop();
            return Err(err);
        }

        if self.sale.status == SaleStatus::Open {
            self.sale.status = SaleStatus::PendingPayment;
        }

        Ok(&self.payments[self.payments.len() - 1])
    }

    /// Completes the sale and freezes `change_due`.
    ///
    /// A zero-net sale finalizes without any payment.
    ///
    /// ## Errors
    /// - `InsufficientPayment` if `total_paid < total_net`; the sale is
    ///   left untouched and stays mutable
    /// - `InvalidSaleStatus` if already completed or cancelled
    pub fn finalize(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_mutable("finalize")?;

        if self.sale.total_paid < self.sale.total_net {
            return Err(CoreError::InsufficientPayment {
                sale_id: self.sale.id.clone(),
                total_net: self.sale.total_net,
                total_paid: self.sale.total_paid,
            });
        }

        self.sale.change_due = (self.sale.total_paid - self.sale.total_net).clamp_non_negative();
        self.sale.status = SaleStatus::Completed;
        self.sale.closed_at = Some(now);

        Ok(())
    }

    /// Abandons the sale. Items and payments stay on record.
    ///
    /// ## Errors
    /// - `InvalidSaleStatus` if already completed or cancelled
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_mutable("cancel")?;

        self.sale.status = SaleStatus::Cancelled;
        self.sale.closed_at = Some(now);

        Ok(())
    }

    /// Recomputes header totals from the logs.
    ///
    /// Fails with `OutOfRange` when any total would leave the money range;
    /// the header is only written once every sum has succeeded.
    fn recompute(&mut self) -> CoreResult<()> {
        let gross = Money::checked_sum("total_gross", self.items.iter().map(|i| i.gross_total))?;
        let discount =
            Money::checked_sum("total_discount", self.items.iter().map(|i| i.discount_value))?;
        let tax = Money::checked_sum("total_tax", self.items.iter().map(|i| i.tax_value))?;
        let net = Money::checked_sum("total_net", self.items.iter().map(|i| i.net_total))?;
        let paid = Money::checked_sum("total_paid", self.payments.iter().map(|p| p.amount))?;

        let expected = gross - discount + tax;
        if expected.is_negative() || net != expected {
            warn!(
                sale_id = %self.sale.id,
                gross = %gross,
                discount = %discount,
                tax = %tax,
                net = %net,
                "Sale totals out of balance; clamping to non-negative values"
            );
        }

        self.sale.total_gross = gross.clamp_non_negative();
        self.sale.total_discount = discount.clamp_non_negative();
        self.sale.total_tax = tax.clamp_non_negative();
        self.sale.total_net = net.clamp_non_negative();
        self.sale.total_paid = paid;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::money::MAX_MONEY_CENTS;
    use crate::types::TaxRate;

    fn product(price_cents: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: "prod-1".to_string(),
            name: "Coffee Beans 1kg".to_string(),
            sku: "COF-1KG".to_string(),
            unit_label: "un".to_string(),
            unit_price: Money::from_cents(price_cents),
            tax_rate: TaxRate::from_bps(1000),
        }
    }

    fn open_sale() -> SaleAggregate {
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

    fn scenario_item() -> NewSaleItem {
        NewSaleItem {
            discount_value: Some(Money::from_units(10)),
            tax_value: Some(Money::from_units(5)),
            ..NewSaleItem::new(product(12000), Quantity::from_units(2))
        }
    }

    fn cash(cents: i64) -> NewPayment {
        NewPayment {
            method: PaymentMethod::Cash,
            amount: Money::from_cents(cents),
            transaction_reference: None,
        }
    }

    #[test]
    fn test_open_sale_has_zero_totals() {
        let sale = open_sale();
        assert_eq!(sale.status(), SaleStatus::Open);
        assert_eq!(sale.sale().total_net, Money::zero());
        assert_eq!(sale.sale().change_due, Money::zero());
        assert!(sale.sale().closed_at.is_none());
        assert!(sale.items().is_empty());
    }

    #[test]
    fn test_receipt_number_format() {
        let id = Uuid::parse_str("4f1c2a9e-0000-4000-8000-000000000000").unwrap();
        let now = DateTime::parse_from_rfc3339("2026-03-14T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let sale = SaleAggregate::open(
            id,
            NewSale {
                operator_id: "op-1".to_string(),
                ..Default::default()
            },
            now,
        )
        .unwrap();

        assert_eq!(sale.sale().receipt_number, "20260314-4F1C2A9E");
    }

    #[test]
    fn test_open_rejects_bad_input() {
        let err = SaleAggregate::open(Uuid::new_v4(), NewSale::default(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));

        let err = SaleAggregate::open(
            Uuid::new_v4(),
            NewSale {
                operator_id: "op-1".to_string(),
                customer: CustomerInfo {
                    email: Some("nope".to_string()),
                    ..Default::default()
                },
                notes: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_add_item_computes_line_and_totals() {
        let mut sale = open_sale();
        let item = sale.add_item(scenario_item(), Utc::now()).unwrap();

        assert_eq!(item.gross_total, Money::from_units(240));
        assert_eq!(item.net_total, Money::from_units(235));
        assert_eq!(item.sequence, 1);
        assert_eq!(item.sku, "COF-1KG");

        let header = sale.sale();
        assert_eq!(header.total_gross, Money::from_units(240));
        assert_eq!(header.total_discount, Money::from_units(10));
        assert_eq!(header.total_tax, Money::from_units(5));
        assert_eq!(header.total_net, Money::from_units(235));
        assert_eq!(sale.balance_due(), Money::from_units(235));
    }

    #[test]
    fn test_price_override_keeps_product_identity() {
        let mut sale = open_sale();
        let input = NewSaleItem {
            unit_price: Some(Money::from_cents(999)),
            ..NewSaleItem::new(product(12000), Quantity::from_units(1))
        };
        let item = sale.add_item(input, Utc::now()).unwrap();

        assert_eq!(item.unit_price, Money::from_cents(999));
        assert_eq!(item.product_name, "Coffee Beans 1kg");
    }

    #[test]
    fn test_fractional_quantity_rounds_half_up() {
        let mut sale = open_sale();
        let input = NewSaleItem::new(product(1299), Quantity::from_milli(375));
        let item = sale.add_item(input, Utc::now()).unwrap();

        assert_eq!(item.gross_total, Money::from_cents(487));
    }

    #[test]
    fn test_tax_derived_from_catalog_when_enabled() {
        let mut sale = open_sale();
        let input = NewSaleItem {
            discount_value: Some(Money::from_units(20)),
            derive_tax_from_catalog: true,
            ..NewSaleItem::new(product(5000), Quantity::from_units(3))
        };
        let item = sale.add_item(input, Utc::now()).unwrap();

        // (150.00 - 20.00) × 10% = 13.00
        assert_eq!(item.tax_value, Money::from_units(13));
        assert_eq!(item.net_total, Money::from_units(143));
    }

    #[test]
    fn test_explicit_tax_wins_over_catalog() {
        let mut sale = open_sale();
        let input = NewSaleItem {
            tax_value: Some(Money::zero()),
            derive_tax_from_catalog: true,
            ..NewSaleItem::new(product(5000), Quantity::from_units(1))
        };
        let item = sale.add_item(input, Utc::now()).unwrap();
        assert_eq!(item.tax_value, Money::zero());
    }

    #[test]
    fn test_oversized_discount_is_clamped() {
        let mut sale = open_sale();
        let input = NewSaleItem {
            discount_value: Some(Money::from_units(500)),
            tax_value: Some(Money::from_units(1)),
            ..NewSaleItem::new(product(1000), Quantity::from_units(1))
        };
        let item = sale.add_item(input, Utc::now()).unwrap();

        assert_eq!(item.discount_value, Money::from_units(11));
        assert_eq!(item.net_total, Money::zero());

        let header = sale.sale();
        assert_eq!(header.total_net, Money::zero());
        assert_eq!(
            header.total_net,
            (header.total_gross - header.total_discount + header.total_tax).clamp_non_negative()
        );
    }

    #[test]
    fn test_add_item_rejects_invalid_input() {
        let mut sale = open_sale();

        let zero_qty = NewSaleItem::new(product(100), Quantity::from_milli(0));
        assert!(sale.add_item(zero_qty, Utc::now()).is_err());

        let negative_price = NewSaleItem {
            unit_price: Some(Money::from_cents(-1)),
            ..NewSaleItem::new(product(100), Quantity::from_units(1))
        };
        assert!(sale.add_item(negative_price, Utc::now()).is_err());

        let negative_discount = NewSaleItem {
            discount_value: Some(Money::from_cents(-1)),
            ..NewSaleItem::new(product(100), Quantity::from_units(1))
        };
        assert!(sale.add_item(negative_discount, Utc::now()).is_err());

        assert!(sale.items().is_empty());
    }

    #[test]
    fn test_sale_item_limit() {
        let mut sale = open_sale();
        for _ in 0..MAX_SALE_ITEMS {
            sale.add_item(NewSaleItem::new(product(100), Quantity::from_units(1)), Utc::now())
                .unwrap();
        }

        let err = sale
            .add_item(NewSaleItem::new(product(100), Quantity::from_units(1)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::SaleTooLarge { max: MAX_SALE_ITEMS }));
    }

    #[test]
    fn test_payment_moves_to_pending() {
        let mut sale = open_sale();
        sale.add_item(scenario_item(), Utc::now()).unwrap();
        sale.add_payment(cash(24000), Utc::now()).unwrap();

        assert_eq!(sale.status(), SaleStatus::PendingPayment);
        assert_eq!(sale.sale().total_paid, Money::from_units(240));
        assert_eq!(sale.balance_due(), Money::zero());
    }

    #[test]
    fn test_payment_rejects_non_positive_amount() {
        let mut sale = open_sale();
        assert!(sale.add_payment(cash(0), Utc::now()).is_err());
        assert!(sale.add_payment(cash(-500), Utc::now()).is_err());
        assert_eq!(sale.status(), SaleStatus::Open);
    }

    #[test]
    fn test_total_paid_independent_of_order() {
        let mut forward = open_sale();
        let mut backward = open_sale();
        let amounts = [1050, 2, 99_999, 3333];

        for cents in amounts {
            forward.add_payment(cash(cents), Utc::now()).unwrap();
        }
        for cents in amounts.iter().rev() {
            backward.add_payment(cash(*cents), Utc::now()).unwrap();
        }

        assert_eq!(forward.sale().total_paid, backward.sale().total_paid);
        assert_eq!(forward.sale().total_paid, Money::from_cents(104_384));
    }

    #[test]
    fn test_finalize_with_change() {
        let mut sale = open_sale();
        sale.add_item(scenario_item(), Utc::now()).unwrap();
        sale.add_payment(cash(24000), Utc::now()).unwrap();
        sale.finalize(Utc::now()).unwrap();

        assert_eq!(sale.status(), SaleStatus::Completed);
        assert_eq!(sale.sale().change_due, Money::from_units(5));
        assert!(sale.sale().closed_at.is_some());
    }

    #[test]
    fn test_finalize_exact_payment_has_no_change() {
        let mut sale = open_sale();
        sale.add_item(scenario_item(), Utc::now()).unwrap();
        sale.add_payment(cash(23500), Utc::now()).unwrap();
        sale.finalize(Utc::now()).unwrap();

        assert_eq!(sale.sale().change_due, Money::zero());
    }

    #[test]
    fn test_empty_sale_finalizes_without_payment() {
        let mut sale = open_sale();
        sale.finalize(Utc::now()).unwrap();

        assert_eq!(sale.status(), SaleStatus::Completed);
        assert_eq!(sale.sale().change_due, Money::zero());
    }

    #[test]
    fn test_finalize_insufficient_payment_leaves_sale_untouched() {
        let mut sale = open_sale();
        sale.add_item(scenario_item(), Utc::now()).unwrap();
        let before = sale.clone();

        let err = sale.finalize(Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
        assert_eq!(sale, before);
        assert!(sale.status().is_mutable());
    }

    #[test]
    fn test_second_finalize_is_rejected() {
        let mut sale = open_sale();
        sale.finalize(Utc::now()).unwrap();
        let closed_at = sale.sale().closed_at;
        let change = sale.sale().change_due;

        let err = sale.finalize(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidSaleStatus {
                status: SaleStatus::Completed,
                ..
            }
        ));
        assert_eq!(sale.sale().closed_at, closed_at);
        assert_eq!(sale.sale().change_due, change);
    }

    #[test]
    fn test_terminal_sales_reject_mutations() {
        let mut completed = open_sale();
        completed.finalize(Utc::now()).unwrap();
        assert!(completed.add_item(scenario_item(), Utc::now()).is_err());
        assert!(completed.add_payment(cash(100), Utc::now()).is_err());
        assert!(completed.cancel(Utc::now()).is_err());

        let mut cancelled = open_sale();
        cancelled.cancel(Utc::now()).unwrap();
        assert_eq!(cancelled.status(), SaleStatus::Cancelled);
        assert!(cancelled.sale().closed_at.is_some());
        assert!(cancelled.add_item(scenario_item(), Utc::now()).is_err());
        assert!(cancelled.finalize(Utc::now()).is_err());
    }

    #[test]
    fn test_from_parts_orders_logs_and_fixes_drift() {
        let mut sale = open_sale();
        sale.add_item(scenario_item(), Utc::now()).unwrap();
        sale.add_item(NewSaleItem::new(product(100), Quantity::from_units(1)), Utc::now())
            .unwrap();
        sale.add_payment(cash(500), Utc::now()).unwrap();

        let (mut header, mut items, payments) = sale.clone().into_parts();
        items.reverse();
        header.total_net = Money::from_cents(1);

        let rebuilt = SaleAggregate::from_parts(header, items, payments);
        assert_eq!(rebuilt, sale);
        assert_eq!(rebuilt.items()[0].sequence, 1);
    }

    fn out_of_range_field(err: CoreError) -> String {
        match err {
            CoreError::Validation(ValidationError::OutOfRange { field, .. }) => field,
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_line_gross_past_money_range_is_rejected() {
        let mut sale = open_sale();
        let input = NewSaleItem {
            unit_price: Some(Money::from_cents(90_000_000_000_000_000)),
            ..NewSaleItem::new(product(100), Quantity::from_units(2))
        };

        let err = sale.add_item(input, Utc::now()).unwrap_err();
        assert_eq!(out_of_range_field(err), "unit_price");

        let at_limit = NewSaleItem {
            unit_price: Some(Money::from_cents(MAX_MONEY_CENTS)),
            ..NewSaleItem::new(product(100), Quantity::from_units(2))
        };
        let err = sale.add_item(at_limit, Utc::now()).unwrap_err();
        assert_eq!(out_of_range_field(err), "gross_total");

        assert!(sale.items().is_empty());
        assert_eq!(sale.sale().total_gross, Money::zero());
        assert_eq!(sale.sale().total_net, Money::zero());
    }

    #[test]
    fn test_line_net_past_money_range_is_rejected() {
        let mut sale = open_sale();
        let input = NewSaleItem {
            tax_value: Some(Money::from_cents(1)),
            ..NewSaleItem::new(product(MAX_MONEY_CENTS), Quantity::from_units(1))
        };

        let err = sale.add_item(input, Utc::now()).unwrap_err();
        assert_eq!(out_of_range_field(err), "net_total");
        assert!(sale.items().is_empty());
    }

    #[test]
    fn test_sale_total_past_money_range_leaves_sale_unchanged() {
        let mut sale = open_sale();
        let big = || NewSaleItem::new(product(MAX_MONEY_CENTS), Quantity::from_units(1));

        sale.add_item(big(), Utc::now()).unwrap();
        let before = sale.clone();

        let err = sale.add_item(big(), Utc::now()).unwrap_err();
        assert_eq!(out_of_range_field(err), "total_gross");
        assert_eq!(sale, before);
        assert_eq!(sale.sale().total_net.cents(), MAX_MONEY_CENTS);
    }

    #[test]
    fn test_payment_total_past_money_range_is_rejected() {
        let mut sale = open_sale();
        sale.add_payment(cash(MAX_MONEY_CENTS), Utc::now()).unwrap();
        let before = sale.clone();

        let err = sale.add_payment(cash(MAX_MONEY_CENTS), Utc::now()).unwrap_err();
        assert_eq!(out_of_range_field(err), "total_paid");
        assert_eq!(sale, before);
        assert_eq!(sale.payments().len(), 1);
        assert_eq!(sale.sale().total_paid.cents(), MAX_MONEY_CENTS);

        // A single payment past the ceiling never reaches the log
        let err = sale.add_payment(cash(i64::MAX), Utc::now()).unwrap_err();
        assert_eq!(out_of_range_field(err), "amount");
        assert_eq!(sale, before);
    }
}
