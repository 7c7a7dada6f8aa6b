//! # Sale Store
//!
//! SQLite implementation of the transactional sale store.
//!
//! ## Unit of Work on SQLite
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  begin(sale_id)   BEGIN (deferred)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load()           SELECT header (+ version), items, payments           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  save(&sale)      UPDATE sales ... version = version + 1               │
//! │       │                 WHERE id = ? AND version = <loaded>            │
//! │       │           0 rows → Conflict                                    │
//! │       │           INSERT items/payments with sequence > loaded         │
//! │       ▼                                                                 │
//! │  commit()         COMMIT                                               │
//! │                                                                         │
//! │  Stale snapshot / lock timeout → SQLITE_BUSY → StoreError::Busy        │
//! │  Dropped before commit        → ROLLBACK                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tally_core::{
    Money, PaymentMethod, Quantity, Sale, SaleAggregate, SaleItem, SalePayment, SaleStatus,
};
use tally_sales::{SaleStore, SaleUnitOfWork, StoreResult};
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    receipt_number: String,
    status: SaleStatus,
    operator_id: String,
    customer_name: Option<String>,
    customer_tax_id: Option<String>,
    customer_email: Option<String>,
    notes: Option<String>,
    total_gross_cents: i64,
    total_discount_cents: i64,
    total_tax_cents: i64,
    total_net_cents: i64,
    total_paid_cents: i64,
    change_due_cents: i64,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl SaleRow {
    fn into_sale(self) -> (Sale, i64) {
        let sale = Sale {
            id: self.id,
            receipt_number: self.receipt_number,
            status: self.status,
            operator_id: self.operator_id,
            customer_name: self.customer_name,
            customer_tax_id: self.customer_tax_id,
            customer_email: self.customer_email,
            notes: self.notes,
            total_gross: Money::from_cents(self.total_gross_cents),
            total_discount: Money::from_cents(self.total_discount_cents),
            total_tax: Money::from_cents(self.total_tax_cents),
            total_net: Money::from_cents(self.total_net_cents),
            total_paid: Money::from_cents(self.total_paid_cents),
            change_due: Money::from_cents(self.change_due_cents),
            opened_at: self.opened_at,
            closed_at: self.closed_at,
        };
        (sale, self.version)
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    sequence: i64,
    product_id: String,
    product_name: String,
    sku: String,
    unit_label: String,
    quantity_milli: i64,
    unit_price_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    gross_cents: i64,
    net_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            sequence: row.sequence,
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            unit_label: row.unit_label,
            quantity: Quantity::from_milli(row.quantity_milli),
            unit_price: Money::from_cents(row.unit_price_cents),
            discount_value: Money::from_cents(row.discount_cents),
            tax_value: Money::from_cents(row.tax_cents),
            gross_total: Money::from_cents(row.gross_cents),
            net_total: Money::from_cents(row.net_cents),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SalePaymentRow {
    id: String,
    sale_id: String,
    sequence: i64,
    method: PaymentMethod,
    amount_cents: i64,
    transaction_reference: Option<String>,
    paid_at: DateTime<Utc>,
}

impl From<SalePaymentRow> for SalePayment {
    fn from(row: SalePaymentRow) -> Self {
        SalePayment {
            id: row.id,
            sale_id: row.sale_id,
            sequence: row.sequence,
            method: row.method,
            amount: Money::from_cents(row.amount_cents),
            transaction_reference: row.transaction_reference,
            paid_at: row.paid_at,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Reads a sale and its logs through `conn`. Returns the stored version too.
async fn load_aggregate(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Option<(SaleAggregate, i64)>> {
    let row: Option<SaleRow> = sqlx::query_as(
        r#"
        SELECT
            id, receipt_number, status, operator_id,
            customer_name, customer_tax_id, customer_email, notes,
            total_gross_cents, total_discount_cents, total_tax_cents,
            total_net_cents, total_paid_cents, change_due_cents,
            opened_at, closed_at, version
        FROM sales
        WHERE id = ?
        "#,
    )
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items: Vec<SaleItemRow> = sqlx::query_as(
        r#"
        SELECT
            id, sale_id, sequence, product_id, product_name, sku, unit_label,
            quantity_milli, unit_price_cents, discount_cents, tax_cents,
            gross_cents, net_cents, created_at
        FROM sale_items
        WHERE sale_id = ?
        ORDER BY sequence
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let payments: Vec<SalePaymentRow> = sqlx::query_as(
        r#"
        SELECT
            id, sale_id, sequence, method, amount_cents,
            transaction_reference, paid_at
        FROM sale_payments
        WHERE sale_id = ?
        ORDER BY sequence
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let (sale, version) = row.into_sale();
    let aggregate = SaleAggregate::from_parts(
        sale,
        items.into_iter().map(SaleItem::from).collect(),
        payments.into_iter().map(SalePayment::from).collect(),
    );

    Ok(Some((aggregate, version)))
}

async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, sequence, product_id, product_name, sku, unit_label,
            quantity_milli, unit_price_cents, discount_cents, tax_cents,
            gross_cents, net_cents, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(item.sequence)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.sku)
    .bind(&item.unit_label)
    .bind(item.quantity.milli())
    .bind(item.unit_price.cents())
    .bind(item.discount_value.cents())
    .bind(item.tax_value.cents())
    .bind(item.gross_total.cents())
    .bind(item.net_total.cents())
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &SalePayment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_payments (
            id, sale_id, sequence, method, amount_cents,
            transaction_reference, paid_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.sequence)
    .bind(payment.method.as_str())
    .bind(payment.amount.cents())
    .bind(&payment.transaction_reference)
    .bind(payment.paid_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Store
// =============================================================================

/// Transactional sale persistence on SQLite.
#[derive(Debug, Clone)]
pub struct SqliteSaleStore {
    pool: SqlitePool,
}

impl SqliteSaleStore {
    /// Creates a new SqliteSaleStore.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSaleStore { pool }
    }

    /// Inserts a new sale header (version 0) with whatever logs it carries.
    pub async fn insert_sale(&self, sale: &SaleAggregate) -> DbResult<()> {
        let header = sale.sale();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, receipt_number, status, operator_id,
                customer_name, customer_tax_id, customer_email, notes,
                total_gross_cents, total_discount_cents, total_tax_cents,
                total_net_cents, total_paid_cents, change_due_cents,
                opened_at, closed_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&header.id)
        .bind(&header.receipt_number)
        .bind(header.status.as_str())
        .bind(&header.operator_id)
        .bind(&header.customer_name)
        .bind(&header.customer_tax_id)
        .bind(&header.customer_email)
        .bind(&header.notes)
        .bind(header.total_gross.cents())
        .bind(header.total_discount.cents())
        .bind(header.total_tax.cents())
        .bind(header.total_net.cents())
        .bind(header.total_paid.cents())
        .bind(header.change_due.cents())
        .bind(header.opened_at)
        .bind(header.closed_at)
        .execute(&mut *tx)
        .await?;

        for item in sale.items() {
            insert_item(&mut tx, item).await?;
        }
        for payment in sale.payments() {
            insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await?;

        debug!(sale_id = %header.id, receipt = %header.receipt_number, "Sale inserted");
        Ok(())
    }

    /// Reads a sale outside any transaction.
    pub async fn get_by_id(&self, sale_id: &str) -> DbResult<Option<SaleAggregate>> {
        let mut conn = self.pool.acquire().await?;
        let loaded = load_aggregate(&mut conn, sale_id).await?;
        Ok(loaded.map(|(aggregate, _)| aggregate))
    }

    /// Opens a transaction scoped to one sale.
    pub async fn begin_unit(&self, sale_id: &str) -> DbResult<SqliteUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(SqliteUnitOfWork {
            tx,
            sale_id: sale_id.to_string(),
            loaded: None,
        })
    }
}

#[async_trait]
impl SaleStore for SqliteSaleStore {
    async fn insert(&self, sale: &SaleAggregate) -> StoreResult<()> {
        Ok(self.insert_sale(sale).await?)
    }

    async fn fetch(&self, sale_id: &str) -> StoreResult<Option<SaleAggregate>> {
        Ok(self.get_by_id(sale_id).await?)
    }

    async fn begin(&self, sale_id: &str) -> StoreResult<Box<dyn SaleUnitOfWork>> {
        Ok(Box::new(self.begin_unit(sale_id).await?))
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// What `load` saw, so `save` can diff against it.
#[derive(Debug, Clone, Copy)]
struct Loaded {
    version: i64,
    last_item_sequence: i64,
    last_payment_sequence: i64,
}

/// One open transaction on one sale. Rolled back on drop unless committed.
pub struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
    sale_id: String,
    loaded: Option<Loaded>,
}

impl SqliteUnitOfWork {
    async fn load_sale(&mut self) -> DbResult<Option<SaleAggregate>> {
        let Some((aggregate, version)) = load_aggregate(&mut self.tx, &self.sale_id).await? else {
            self.loaded = None;
            return Ok(None);
        };

        self.loaded = Some(Loaded {
            version,
            last_item_sequence: aggregate.items().last().map_or(0, |i| i.sequence),
            last_payment_sequence: aggregate.payments().last().map_or(0, |p| p.sequence),
        });
        Ok(Some(aggregate))
    }

    async fn save_sale(&mut self, sale: &SaleAggregate) -> DbResult<()> {
        if sale.id() != self.sale_id {
            return Err(DbError::Internal(format!(
                "sale {} is not part of this unit of work",
                sale.id()
            )));
        }
        let loaded = self.loaded.ok_or_else(|| {
            DbError::Internal(format!("sale {} saved before it was loaded", self.sale_id))
        })?;

        let header = sale.sale();
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = ?,
                total_gross_cents = ?,
                total_discount_cents = ?,
                total_tax_cents = ?,
                total_net_cents = ?,
                total_paid_cents = ?,
                change_due_cents = ?,
                closed_at = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(header.status.as_str())
        .bind(header.total_gross.cents())
        .bind(header.total_discount.cents())
        .bind(header.total_tax.cents())
        .bind(header.total_net.cents())
        .bind(header.total_paid.cents())
        .bind(header.change_due.cents())
        .bind(header.closed_at)
        .bind(&header.id)
        .bind(loaded.version)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                sale_id: header.id.clone(),
            });
        }

        let mut new_items = 0;
        for item in sale
            .items()
            .iter()
            .filter(|i| i.sequence > loaded.last_item_sequence)
        {
            insert_item(&mut self.tx, item).await?;
            new_items += 1;
        }

        let mut new_payments = 0;
        for payment in sale
            .payments()
            .iter()
            .filter(|p| p.sequence > loaded.last_payment_sequence)
        {
            insert_payment(&mut self.tx, payment).await?;
            new_payments += 1;
        }

        self.loaded = Some(Loaded {
            version: loaded.version + 1,
            last_item_sequence: sale.items().last().map_or(0, |i| i.sequence),
            last_payment_sequence: sale.payments().last().map_or(0, |p| p.sequence),
        });

        debug!(
            sale_id = %header.id,
            status = %header.status,
            version = loaded.version + 1,
            new_items,
            new_payments,
            "Sale staged"
        );
        Ok(())
    }
}

#[async_trait]
impl SaleUnitOfWork for SqliteUnitOfWork {
    async fn load(&mut self) -> StoreResult<Option<SaleAggregate>> {
        Ok(self.load_sale().await?)
    }

    async fn save(&mut self, sale: &SaleAggregate) -> StoreResult<()> {
        Ok(self.save_sale(sale).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        this.tx.commit().await.map_err(DbError::from)?;
        debug!(sale_id = %this.sale_id, "Sale committed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};
    use std::sync::Arc;
    use tally_core::{NewPayment, NewSale, NewSaleItem};
    use tally_sales::{AddItemRequest, SaleService, SaleServiceConfig, StoreError};
    use uuid::Uuid;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn open_sale() -> SaleAggregate {
        SaleAggregate::open(
            Uuid::new_v4(),
            NewSale {
                operator_id: "op-7".to_string(),
                notes: Some("counter 2".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    async fn coffee(db: &Database) -> tally_core::ProductSnapshot {
        db.products()
            .insert(NewProduct {
                sku: "COFFEE-250".to_string(),
                name: "Ground coffee 250g".to_string(),
                unit_label: "un".to_string(),
                price_cents: 1890,
                tax_rate_bps: 0,
            })
            .await
            .unwrap()
            .snapshot()
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip() {
        let db = db().await;
        let store = db.sales();
        let sale = open_sale();

        store.insert(&sale).await.unwrap();

        let fetched = store.fetch(sale.id()).await.unwrap().unwrap();
        assert_eq!(fetched, sale);
        assert!(store.fetch("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unit_of_work_appends_logs() {
        let db = db().await;
        let store = db.sales();
        let product = coffee(&db).await;
        let sale = open_sale();
        store.insert(&sale).await.unwrap();

        let mut uow = store.begin(sale.id()).await.unwrap();
        let mut loaded = uow.load().await.unwrap().unwrap();
        loaded
            .add_item(NewSaleItem::new(product, Quantity::from_milli(1500)), Utc::now())
            .unwrap();
        loaded
            .add_payment(
                NewPayment {
                    method: PaymentMethod::Cash,
                    amount: Money::from_cents(3000),
                    transaction_reference: None,
                },
                Utc::now(),
            )
            .unwrap();
        loaded.finalize(Utc::now()).unwrap();
        uow.save(&loaded).await.unwrap();
        uow.commit().await.unwrap();

        let fetched = store.fetch(sale.id()).await.unwrap().unwrap();
        assert_eq!(fetched, loaded);
        assert_eq!(fetched.status(), SaleStatus::Completed);
        assert_eq!(fetched.items()[0].quantity, Quantity::from_milli(1500));
        // 18.90 × 1.5 = 28.35
        assert_eq!(fetched.sale().total_net, Money::from_cents(2835));
        assert_eq!(fetched.sale().change_due, Money::from_cents(165));
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let db = db().await;
        let store = db.sales();
        let sale = open_sale();
        store.insert(&sale).await.unwrap();

        {
            let mut uow = store.begin(sale.id()).await.unwrap();
            let mut loaded = uow.load().await.unwrap().unwrap();
            loaded.cancel(Utc::now()).unwrap();
            uow.save(&loaded).await.unwrap();
        }

        let fetched = store.fetch(sale.id()).await.unwrap().unwrap();
        assert_eq!(fetched.status(), SaleStatus::Open);
    }

    #[tokio::test]
    async fn test_stale_version_is_a_conflict() {
        let db = db().await;
        let store = db.sales();
        let sale = open_sale();
        store.insert(&sale).await.unwrap();

        let mut uow = store.begin_unit(sale.id()).await.unwrap();
        let mut loaded = uow.load_sale().await.unwrap().unwrap();

        // Another writer got there first.
        sqlx::query("UPDATE sales SET version = version + 1 WHERE id = ?")
            .bind(sale.id())
            .execute(&mut *uow.tx)
            .await
            .unwrap();

        loaded.cancel(Utc::now()).unwrap();
        let err = uow.save_sale(&loaded).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(StoreError::from(err).is_retryable());
    }

    #[tokio::test]
    async fn test_save_requires_load() {
        let db = db().await;
        let store = db.sales();
        let sale = open_sale();
        store.insert(&sale).await.unwrap();

        let mut uow = store.begin(sale.id()).await.unwrap();
        assert!(uow.save(&sale).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_on_file_database() {
        let dir = std::env::temp_dir().join(format!("tally-db-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let db = Database::new(DbConfig::new(dir.join("tally.db")).max_connections(4))
            .await
            .unwrap();
        let product = coffee(&db).await;

        let service = SaleService::new(
            Arc::new(db.sales()),
            Arc::new(db.products()),
            SaleServiceConfig {
                max_attempts: 20,
                retry_backoff_ms: 2,
                ..Default::default()
            },
        );

        let sale = service
            .open_sale(NewSale {
                operator_id: "op-1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let sale_id = sale.id().to_string();

        service
            .add_item(
                &sale_id,
                AddItemRequest {
                    product_id: product.product_id.clone(),
                    quantity: Quantity::from_units(10),
                    unit_price: None,
                    discount_value: None,
                    tax_value: None,
                },
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let sale_id = sale_id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .add_payment(
                        &sale_id,
                        NewPayment {
                            method: PaymentMethod::Debit,
                            amount: Money::from_cents(1000),
                            transaction_reference: None,
                        },
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let fetched = service.get_sale(&sale_id).await.unwrap();
        assert_eq!(fetched.payments().len(), 8);
        assert_eq!(fetched.sale().total_paid, Money::from_cents(8000));
        let sequences: Vec<i64> = fetched.payments().iter().map(|p| p.sequence).collect();
        assert_eq!(sequences, (1..=8).collect::<Vec<i64>>());

        db.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
