//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Sale state machine violations                  │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-sales errors                                                    │
//! │  └── PosError         - Closed taxonomy returned to callers            │
//! │                                                                         │
//! │  pos-api errors                                                        │
//! │  └── ApiError         - HTTP status + JSON body                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → PosError → ApiError → Client      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Sale aggregate rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding an item or payment to a completed/cancelled sale
    /// - Finalizing a sale twice
    /// - Rendering a receipt for a sale that is not completed
    #[error("Sale {sale_id} is {status}, cannot {operation}")]
    InvalidSaleStatus {
        sale_id: String,
        status: SaleStatus,
        operation: &'static str,
    },

    /// Finalize attempted before enough money was collected.
    ///
    /// ## User Workflow
    /// ```text
    /// Net total: 235.00   Paid: 200.00
    ///      │
    ///      ▼
    /// finalize()
    ///      │
    ///      ▼
    /// InsufficientPayment { due: 35.00 }  → register asks for more payment
    /// ```
    #[error("Sale {sale_id} is short by {}: net {total_net}, paid {total_paid}", shortfall(.total_net, .total_paid))]
    InsufficientPayment {
        sale_id: String,
        total_net: Money,
        total_paid: Money,
    },

    /// Sale has reached the maximum allowed number of items.
    #[error("Sale cannot have more than {max} items")]
    SaleTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn shortfall(total_net: &Money, total_paid: &Money) -> Money {
    *total_net - *total_paid
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are never retried: the caller must correct the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: String, max: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email, bad decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", .allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientPayment {
            sale_id: "s-1".to_string(),
            total_net: Money::from_cents(23500),
            total_paid: Money::from_cents(20000),
        };
        assert_eq!(
            err.to_string(),
            "Sale s-1 is short by 35.00: net 235.00, paid 200.00"
        );

        let err = CoreError::InvalidSaleStatus {
            sale_id: "s-1".to_string(),
            status: SaleStatus::Completed,
            operation: "add item",
        };
        assert_eq!(err.to_string(), "Sale s-1 is completed, cannot add item");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "operator_id".to_string(),
        };
        assert_eq!(err.to_string(), "operator_id is required");

        let err = ValidationError::NotAllowed {
            field: "method".to_string(),
            allowed: vec!["cash".to_string(), "pix".to_string()],
        };
        assert_eq!(err.to_string(), "method must be one of: cash, pix");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
