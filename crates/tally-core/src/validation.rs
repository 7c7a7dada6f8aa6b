//! # Validation Module
//!
//! Input validation for sale operations and catalog entries.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP DTOs (pos-api)                                          │
//! │  ├── JSON shape, decimal parsing                                       │
//! │  └── Unknown payment method names                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, email format, positivity, ranges                         │
//! │  └── Normalization (trim, empty → None)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK constraints on money columns                                │
//! │  └── UNIQUE / foreign key constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Quantity;
//! use tally_core::validation::{validate_operator_id, validate_quantity};
//!
//! assert_eq!(validate_operator_id("  op-7 ").unwrap(), "op-7");
//! assert!(validate_quantity(Quantity::from_units(0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::{Money, Quantity, MAX_MONEY_CENTS};
use crate::types::CustomerInfo;
use crate::MAX_ITEM_QUANTITY_MILLI;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// Field limits (characters)
pub const MAX_OPERATOR_ID_LEN: usize = 64;
pub const MAX_CUSTOMER_NAME_LEN: usize = 200;
pub const MAX_CUSTOMER_TAX_ID_LEN: usize = 32;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_NOTES_LEN: usize = 1000;
pub const MAX_REFERENCE_LEN: usize = 120;

// =============================================================================
// String Validators
// =============================================================================

fn check_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates and trims the operator identity attached to a new sale.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
pub fn validate_operator_id(operator_id: &str) -> ValidationResult<String> {
    let operator_id = operator_id.trim();

    if operator_id.is_empty() {
        return Err(ValidationError::Required {
            field: "operator_id".to_string(),
        });
    }
    check_length("operator_id", operator_id, MAX_OPERATOR_ID_LEN)?;

    Ok(operator_id.to_string())
}

/// Trims an optional free-text field; blank input becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    check_length(field, value, max)?;
    Ok(Some(value.to_string()))
}

/// Validates an email address.
///
/// Shape check only: one `@`, a non-empty local part, a dotted domain
/// and no whitespace.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_email;
///
/// assert!(validate_email("ana@example.com").is_ok());
/// assert!(validate_email("ana@localhost").is_err());
/// assert!(validate_email("ana example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "customer_email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    check_length("customer_email", email, MAX_EMAIL_LEN)?;

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates and normalizes the optional customer block of a new sale.
pub fn validate_customer(customer: &CustomerInfo) -> ValidationResult<CustomerInfo> {
    let name = validate_optional_text(
        "customer_name",
        customer.name.as_deref(),
        MAX_CUSTOMER_NAME_LEN,
    )?;
    let tax_id = validate_optional_text(
        "customer_tax_id",
        customer.tax_id.as_deref(),
        MAX_CUSTOMER_TAX_ID_LEN,
    )?;
    let email = validate_optional_text("customer_email", customer.email.as_deref(), MAX_EMAIL_LEN)?;

    if let Some(email) = &email {
        validate_email(email)?;
    }

    Ok(CustomerInfo {
        name,
        tax_id,
        email,
    })
}

pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    validate_optional_text("notes", notes, MAX_NOTES_LEN)
}

/// Validates a payment's external transaction reference.
pub fn validate_reference(reference: Option<&str>) -> ValidationResult<Option<String>> {
    validate_optional_text("transaction_reference", reference, MAX_REFERENCE_LEN)
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    check_length("sku", sku, 50)?;

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    check_length("name", name, 200)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed 99 999.999
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Register: Add Item                                                     │
/// │                                                                         │
/// │  Cashier weighs 0.375 kg                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(0.375) ← THIS FUNCTION                              │
/// │       │                                                                 │
/// │       ├── qty <= 0?        → "quantity must be positive"               │
/// │       ├── qty > 99999.999? → "quantity must be between ..."            │
/// │       └── OK → append line                                             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty.milli() > MAX_ITEM_QUANTITY_MILLI {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: Quantity::from_milli(1).to_string(),
            max: Quantity::from_milli(MAX_ITEM_QUANTITY_MILLI).to_string(),
        });
    }

    Ok(())
}

/// Validates a money input that may be zero (prices, discounts, taxes).
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("unit_price", Money::zero()).is_ok());
/// assert!(validate_non_negative("discount_value", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_money_limit(field, amount)
}

/// Validates a payment amount. Zero and negative payments are refused.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    validate_money_limit("amount", amount)
}

/// Rejects amounts past `MAX_MONEY_CENTS`.
pub fn validate_money_limit(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_within_limit() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0.00".to_string(),
            max: Money::from_cents(MAX_MONEY_CENTS).to_string(),
        });
    }
    Ok(())
}

pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_non_negative("price", Money::from_cents(cents))
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: "0".to_string(),
            max: "10000".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("sale_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("sale_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
