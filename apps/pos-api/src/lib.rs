//! # Tally POS API
//!
//! HTTP front for the sale lifecycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          POS API Server                                 │
//! │                                                                         │
//! │  Register ──► axum Router ──► SaleService ──► SqliteSaleStore          │
//! │                   │               │                                     │
//! │                   │               └──────────► ProductRepository        │
//! │                   │                                                     │
//! │                   └──► ReceiptGenerator (GET /sales/{id}/receipt)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tracing_subscriber::EnvFilter;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    routes::router(state)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally_db=trace` - Trace a single crate
/// - Default: `info,tally=debug,pos_api=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,pos_api=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
