//! # API Error Type
//!
//! Maps the service's closed error taxonomy to HTTP responses.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────┬────────┬──────────────────────────┐
//! │ Error                        │ Status │ Body "error"             │
//! ├──────────────────────────────┼────────┼──────────────────────────┤
//! │ Validation / bad JSON        │ 400    │ validation_error         │
//! │ NotFound                     │ 404    │ not_found                │
//! │ InvalidState                 │ 409    │ invalid_state            │
//! │ InsufficientPayment          │ 422    │ insufficient_payment     │
//! │ Store (after retries)        │ 503    │ storage_error            │
//! │ Store, write rejected        │ 500    │ storage_error            │
//! │ Receipt render failure       │ 500    │ receipt_error            │
//! └──────────────────────────────┴────────┴──────────────────────────┘
//! ```
//!
//! Bodies are always `{"error": <code>, "message": <text>}`. Storage and
//! rendering failures are logged in full and answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tally_core::ValidationError;
use tally_receipt::ReceiptError;
use tally_sales::{PosError, StoreError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Pos(#[from] PosError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    /// Request body could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Pos(PosError::Validation(err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Pos(err) => {
                let status = match &err {
                    PosError::Validation(_) => StatusCode::BAD_REQUEST,
                    PosError::NotFound { .. } => StatusCode::NOT_FOUND,
                    PosError::InvalidState { .. } => StatusCode::CONFLICT,
                    PosError::InsufficientPayment { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    PosError::Store(store) if matches!(store, StoreError::Rejected(_)) => {
                        error!(error = %store, "Store rejected a validated write");
                        return json_error(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            err.code(),
                            "Sale could not be stored",
                        );
                    }
                    PosError::Store(store) => {
                        error!(error = %store, "Storage failure surfaced to client");
                        return json_error(
                            StatusCode::SERVICE_UNAVAILABLE,
                            err.code(),
                            "Storage temporarily unavailable, please retry",
                        );
                    }
                };
                json_error(status, err.code(), err.to_string())
            }

            ApiError::Receipt(err) => match err {
                ReceiptError::InvalidState { .. } => {
                    json_error(StatusCode::CONFLICT, "invalid_state", err.to_string())
                }
                ReceiptError::InvalidOptions(_) | ReceiptError::Render(_) => {
                    error!(error = %err, "Receipt generation failed");
                    json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "receipt_error",
                        "Receipt could not be generated",
                    )
                }
            },

            ApiError::BadRequest(message) => {
                json_error(StatusCode::BAD_REQUEST, "validation_error", message)
            }
        }
    }
}
