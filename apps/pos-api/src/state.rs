//! Shared handler state.

use std::sync::Arc;

use tally_db::Database;
use tally_receipt::ReceiptGenerator;
use tally_sales::SaleService;

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub sales: SaleService,
    pub receipts: Arc<ReceiptGenerator>,
    /// Probed by `/health` when present.
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(sales: SaleService, receipts: ReceiptGenerator) -> Self {
        AppState {
            sales,
            receipts: Arc::new(receipts),
            db: None,
        }
    }

    /// Production wiring: SQLite store and catalog behind the service.
    pub fn with_database(db: Database, config: &ApiConfig) -> Self {
        let sales = SaleService::new(
            Arc::new(db.sales()),
            Arc::new(db.products()),
            config.sales.clone(),
        );
        AppState {
            sales,
            receipts: Arc::new(ReceiptGenerator::new(config.receipt.clone())),
            db: Some(db),
        }
    }
}
