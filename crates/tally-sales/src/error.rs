//! # Service Error Types
//!
//! The closed error taxonomy every sale operation returns.
//!
//! ## Mapping
//! ```text
//! ┌──────────────────────────────┬──────────────────────┬───────────┐
//! │ Source                       │ PosError             │ Retryable │
//! ├──────────────────────────────┼──────────────────────┼───────────┤
//! │ ValidationError              │ Validation           │ no        │
//! │ CoreError::SaleTooLarge      │ Validation           │ no        │
//! │ sale / product missing       │ NotFound             │ no        │
//! │ CoreError::InvalidSaleStatus │ InvalidState         │ no        │
//! │ CoreError::InsufficientPay.  │ InsufficientPayment  │ no        │
//! │ StoreError::Busy / Conflict  │ Store                │ yes       │
//! │ StoreError::Rejected         │ Store                │ no        │
//! │ StoreError::Backend          │ Store                │ no        │
//! └──────────────────────────────┴──────────────────────┴───────────┘
//! ```

use tally_core::{CoreError, Money, SaleStatus, ValidationError};
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by [`crate::SaleService`].
#[derive(Debug, Error)]
pub enum PosError {
    /// Caller input was rejected. Never retried.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The sale's current status forbids the operation.
    #[error("Sale {sale_id} is {status}, cannot {operation}")]
    InvalidState {
        sale_id: String,
        status: SaleStatus,
        operation: &'static str,
    },

    /// Finalize attempted while `total_paid < total_net`.
    #[error("Sale {sale_id} needs {total_net}, only {total_paid} paid")]
    InsufficientPayment {
        sale_id: String,
        total_net: Money,
        total_paid: Money,
    },

    /// Persistence failed. Transient variants have already been retried.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl PosError {
    pub(crate) fn sale_not_found(sale_id: &str) -> Self {
        PosError::NotFound {
            entity: "Sale",
            id: sale_id.to_string(),
        }
    }

    pub(crate) fn product_not_found(product_id: &str) -> Self {
        PosError::NotFound {
            entity: "Product",
            id: product_id.to_string(),
        }
    }

    /// Stable machine-readable code for API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PosError::Validation(_) => "validation_error",
            PosError::NotFound { .. } => "not_found",
            PosError::InvalidState { .. } => "invalid_state",
            PosError::InsufficientPayment { .. } => "insufficient_payment",
            PosError::Store(_) => "storage_error",
        }
    }
}

impl From<CoreError> for PosError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSaleStatus {
                sale_id,
                status,
                operation,
            } => PosError::InvalidState {
                sale_id,
                status,
                operation,
            },
            CoreError::InsufficientPayment {
                sale_id,
                total_net,
                total_paid,
            } => PosError::InsufficientPayment {
                sale_id,
                total_net,
                total_paid,
            },
            CoreError::SaleTooLarge { max } => PosError::Validation(ValidationError::OutOfRange {
                field: "sale items".to_string(),
                min: "0".to_string(),
                max: max.to_string(),
            }),
            CoreError::Validation(err) => PosError::Validation(err),
        }
    }
}

/// Convenience type alias for service results.
pub type PosResult<T> = Result<T, PosError>;
