//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Catalog Lookup During a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleService::add_item(product_id)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductCatalog::find_product ── SELECT ... WHERE id = ? AND is_active │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductSnapshot { name, sku, unit_label, unit_price, tax_rate }       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  copied onto the sale item; later catalog edits never touch it         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tally_core::validation::{
    validate_price_cents, validate_product_name, validate_sku, validate_tax_rate_bps,
};
use tally_core::{Product, ProductSnapshot, ValidationError};
use tally_sales::{ProductCatalog, StoreError, StoreResult};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, sku, name, unit_label, price_cents, tax_rate_bps, \
                               is_active, created_at, updated_at";

/// Raw `products` row.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    unit_label: String,
    price_cents: i64,
    tax_rate_bps: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let tax_rate_bps = u32::try_from(row.tax_rate_bps).map_err(|_| {
            DbError::CorruptRow(format!(
                "product {} has tax_rate_bps {}",
                row.id, row.tax_rate_bps
            ))
        })?;

        Ok(Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            unit_label: row.unit_label,
            price_cents: row.price_cents,
            tax_rate_bps,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    /// Display unit: `un`, `kg`, `m`...
    pub unit_label: String,
    pub price_cents: i64,
    pub tax_rate_bps: u32,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(NewProduct { .. }).await?;
/// let found = repo.get_by_sku("COFFEE-250").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product after validating it.
    ///
    /// ## Errors
    /// - `InvalidProduct` for a bad SKU, name, price, tax rate or unit label
    /// - `UniqueViolation` if the SKU already exists
    pub async fn insert(&self, product: NewProduct) -> DbResult<Product> {
        let sku = product.sku.trim().to_string();
        validate_sku(&sku)?;
        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;
        validate_tax_rate_bps(product.tax_rate_bps)?;

        let unit_label = product.unit_label.trim();
        if unit_label.is_empty() {
            return Err(ValidationError::Required {
                field: "unit_label".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let created = Product {
            id: Uuid::new_v4().to_string(),
            sku,
            name: product.name.trim().to_string(),
            unit_label: unit_label.to_string(),
            price_cents: product.price_cents,
            tax_rate_bps: product.tax_rate_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, unit_label, price_cents, tax_rate_bps,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&created.id)
        .bind(&created.sku)
        .bind(&created.name)
        .bind(&created.unit_label)
        .bind(created.price_cents)
        .bind(i64::from(created.tax_rate_bps))
        .bind(created.is_active)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %created.id, sku = %created.sku, "Product inserted");
        Ok(created)
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Gets a product by SKU (exact match).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?"
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Counts all products, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Activates or retires a product. Retired products cannot be sold.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn find_product(&self, product_id: &str) -> StoreResult<Option<ProductSnapshot>> {
        let product = self.get_by_id(product_id).await.map_err(StoreError::from)?;
        Ok(product.filter(|p| p.is_active).map(|p| p.snapshot()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
