//! # Sale Service
//!
//! Runs each sale operation as one unit of work against the injected store.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(sale_id, request)                                             │
//! │       │                                                                 │
//! │       ├── catalog.find_product()  ── None ──► NotFound(Product)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌── attempt n ─────────────────────────────────────────────────────┐  │
//! │  │  store.begin(sale_id)                                             │  │
//! │  │  uow.load()                   ── None ──► NotFound(Sale)          │  │
//! │  │  aggregate.add_item()         ── rule ──► Validation/InvalidState │  │
//! │  │  uow.save() + uow.commit()                                        │  │
//! │  └───────────────┬───────────────────────────────────────────────────┘  │
//! │                  │ Busy / Conflict and n < max_attempts                 │
//! │                  └──► sleep(backoff) ──► attempt n+1                    │
//! │                                                                         │
//! │  returns the refreshed aggregate                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tally_core::{
    validation, CoreResult, Money, NewPayment, NewSale, NewSaleItem, Quantity, SaleAggregate,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SaleServiceConfig;
use crate::error::{PosError, PosResult};
use crate::store::{ProductCatalog, SaleStore};

/// Input for [`SaleService::add_item`].
#[derive(Debug, Clone)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: Quantity,
    /// Replaces the catalog price for this line only.
    pub unit_price: Option<Money>,
    pub discount_value: Option<Money>,
    pub tax_value: Option<Money>,
}

/// The sale lifecycle entry point.
#[derive(Clone)]
pub struct SaleService {
    store: Arc<dyn SaleStore>,
    catalog: Arc<dyn ProductCatalog>,
    config: SaleServiceConfig,
}

impl SaleService {
    pub fn new(
        store: Arc<dyn SaleStore>,
        catalog: Arc<dyn ProductCatalog>,
        config: SaleServiceConfig,
    ) -> Self {
        SaleService {
            store,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &SaleServiceConfig {
        &self.config
    }

    /// Opens a sale with zero totals.
    ///
    /// ## Errors
    /// - `Validation` for a bad operator id or customer fields
    pub async fn open_sale(&self, input: NewSale) -> PosResult<SaleAggregate> {
        let sale = SaleAggregate::open(Uuid::new_v4(), input, Utc::now())?;
        debug!(sale_id = %sale.id(), operator_id = %sale.sale().operator_id, "Opening sale");

        self.with_retry("open sale", sale.id(), || async {
            Ok(self.store.insert(&sale).await?)
        })
        .await?;

        info!(
            sale_id = %sale.id(),
            receipt_number = %sale.sale().receipt_number,
            "Sale opened"
        );
        Ok(sale)
    }

    /// Appends a line item.
    ///
    /// The product is always resolved through the catalog so the line
    /// carries its name, SKU and unit; a price override only replaces the
    /// unit price.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown sale or an unknown/inactive product
    /// - `InvalidState` when the sale is completed or cancelled
    /// - `Validation` for bad quantity/money input or a full sale
    pub async fn add_item(
        &self,
        sale_id: &str,
        request: AddItemRequest,
    ) -> PosResult<SaleAggregate> {
        debug!(
            sale_id,
            product_id = %request.product_id,
            quantity = %request.quantity,
            "Adding item"
        );

        let product = self
            .catalog
            .find_product(&request.product_id)
            .await?
            .ok_or_else(|| PosError::product_not_found(&request.product_id))?;

        let input = NewSaleItem {
            product,
            quantity: request.quantity,
            unit_price: request.unit_price,
            discount_value: request.discount_value,
            tax_value: request.tax_value,
            derive_tax_from_catalog: self.config.derive_tax_from_catalog,
        };
        let now = Utc::now();

        let sale = self
            .mutate("add item", sale_id, &|sale: &mut SaleAggregate| {
                sale.add_item(input.clone(), now).map(|_| ())
            })
            .await?;

        debug!(sale_id, total_net = %sale.sale().total_net, items = sale.items().len(), "Item added");
        Ok(sale)
    }

    /// Records a payment; an open sale becomes pending payment.
    ///
    /// ## Errors
    /// - `NotFound`, `InvalidState`, `Validation`
    pub async fn add_payment(&self, sale_id: &str, payment: NewPayment) -> PosResult<SaleAggregate> {
        debug!(sale_id, method = %payment.method, amount = %payment.amount, "Adding payment");
        let now = Utc::now();

        let sale = self
            .mutate("add payment", sale_id, &|sale: &mut SaleAggregate| {
                sale.add_payment(payment.clone(), now).map(|_| ())
            })
            .await?;

        info!(
            sale_id,
            status = %sale.status(),
            total_paid = %sale.sale().total_paid,
            balance_due = %sale.balance_due(),
            "Payment recorded"
        );
        Ok(sale)
    }

    /// Completes the sale and freezes change due.
    ///
    /// ## Errors
    /// - `InsufficientPayment` while `total_paid < total_net` (sale unchanged)
    /// - `InvalidState` when already completed or cancelled
    /// - `NotFound`
    pub async fn finalize_sale(&self, sale_id: &str) -> PosResult<SaleAggregate> {
        debug!(sale_id, "Finalizing sale");
        let now = Utc::now();

        let sale = self
            .mutate("finalize", sale_id, &|sale: &mut SaleAggregate| sale.finalize(now))
            .await?;

        info!(
            sale_id,
            total_net = %sale.sale().total_net,
            total_paid = %sale.sale().total_paid,
            change_due = %sale.sale().change_due,
            "Sale completed"
        );
        Ok(sale)
    }

    /// Abandons an open or pending sale.
    ///
    /// ## Errors
    /// - `InvalidState` when already completed or cancelled
    /// - `NotFound`
    pub async fn cancel_sale(&self, sale_id: &str) -> PosResult<SaleAggregate> {
        debug!(sale_id, "Cancelling sale");
        let now = Utc::now();

        let sale = self
            .mutate("cancel", sale_id, &|sale: &mut SaleAggregate| sale.cancel(now))
            .await?;

        info!(sale_id, "Sale cancelled");
        Ok(sale)
    }

    /// Reads a sale with its items and payments.
    pub async fn get_sale(&self, sale_id: &str) -> PosResult<SaleAggregate> {
        ensure_sale_id(sale_id)?;
        self.with_retry("get sale", sale_id, || async {
            Ok(self.store.fetch(sale_id).await?)
        })
        .await?
        .ok_or_else(|| PosError::sale_not_found(sale_id))
    }

    // -------------------------------------------------------------------------
    // Unit of work plumbing
    // -------------------------------------------------------------------------

    async fn mutate(
        &self,
        operation: &'static str,
        sale_id: &str,
        apply: &(dyn Fn(&mut SaleAggregate) -> CoreResult<()> + Send + Sync),
    ) -> PosResult<SaleAggregate> {
        ensure_sale_id(sale_id)?;
        self.with_retry(operation, sale_id, || self.try_mutate(sale_id, apply))
            .await
    }

    async fn try_mutate(
        &self,
        sale_id: &str,
        apply: &(dyn Fn(&mut SaleAggregate) -> CoreResult<()> + Send + Sync),
    ) -> PosResult<SaleAggregate> {
        let mut uow = self.store.begin(sale_id).await?;
        let mut sale = uow
            .load()
            .await?
            .ok_or_else(|| PosError::sale_not_found(sale_id))?;

        apply(&mut sale)?;

        uow.save(&sale).await?;
        uow.commit().await?;
        Ok(sale)
    }

    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        sale_id: &str,
        mut run: F,
    ) -> PosResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PosResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match run().await {
                Err(PosError::Store(err)) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        operation,
                        sale_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(PosError::Store(err)) => {
                    error!(operation, sale_id, attempt, error = %err, "Store failure");
                    return Err(PosError::Store(err));
                }
                other => return other,
            }
        }
    }
}

/// Sale ids are UUIDs; anything else cannot name a stored sale.
fn ensure_sale_id(sale_id: &str) -> PosResult<()> {
    validation::validate_uuid("sale_id", sale_id).map_err(|_| PosError::sale_not_found(sale_id))
}

// =============================================================================
// Unit Tests
// =============================================================================
