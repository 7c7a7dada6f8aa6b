//! # HTTP Routes
//!
//! ```text
//! POST /sales                    open a sale              201
//! GET  /sales/{id}               sale with items/payments 200
//! POST /sales/{id}/items         append an item           200
//! POST /sales/{id}/payments      record a payment         200
//! POST /sales/{id}/finalize      complete the sale        200
//! POST /sales/{id}/cancel        abandon the sale         200
//! GET  /sales/{id}/receipt       PDF, completed only      200 application/pdf
//! GET  /health                   liveness + DB probe      200 / 503
//! ```
//!
//! Handlers only translate; every rule lives in `SaleService`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tally_core::NewPayment;
use tally_sales::AddItemRequest;
use tracing::{debug, info, warn};

use crate::dto::{AddItemBody, AddPaymentBody, HealthResponse, OpenSaleBody, SaleResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the authenticated operator, set by the fronting proxy.
pub const OPERATOR_HEADER: &str = "x-operator-id";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sales", post(open_sale))
        .route("/sales/{id}", get(get_sale))
        .route("/sales/{id}/items", post(add_item))
        .route("/sales/{id}/payments", post(add_payment))
        .route("/sales/{id}/finalize", post(finalize_sale))
        .route("/sales/{id}/cancel", post(cancel_sale))
        .route("/sales/{id}/receipt", get(get_receipt))
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn health(State(state): State<AppState>) -> Response {
    if let Some(db) = &state.db {
        if !db.health_check().await {
            warn!("Health check failed: database unreachable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
                .into_response();
        }
    }
    Json(HealthResponse { status: "ok" }).into_response()
}

async fn open_sale(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<OpenSaleBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleResponse>)> {
    let header_operator = headers
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let input = body(payload)?.into_new_sale(header_operator);

    let sale = state.sales.open_sale(input).await?;
    info!(sale_id = %sale.id(), "POST /sales");
    Ok((StatusCode::CREATED, Json(SaleResponse::from(&sale))))
}

async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state.sales.get_sale(&id).await?;
    Ok(Json(SaleResponse::from(&sale)))
}

async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddItemBody>, JsonRejection>,
) -> ApiResult<Json<SaleResponse>> {
    let request = AddItemRequest::try_from(body(payload)?)?;
    let sale = state.sales.add_item(&id, request).await?;
    Ok(Json(SaleResponse::from(&sale)))
}

async fn add_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddPaymentBody>, JsonRejection>,
) -> ApiResult<Json<SaleResponse>> {
    let payment = NewPayment::try_from(body(payload)?)?;
    let sale = state.sales.add_payment(&id, payment).await?;
    Ok(Json(SaleResponse::from(&sale)))
}

async fn finalize_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state.sales.finalize_sale(&id).await?;
    Ok(Json(SaleResponse::from(&sale)))
}

async fn cancel_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    let sale = state.sales.cancel_sale(&id).await?;
    Ok(Json(SaleResponse::from(&sale)))
}

async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let sale = state.sales.get_sale(&id).await?;
    let receipt = state.receipts.generate(&sale)?;
    debug!(sale_id = %id, size_bytes = receipt.size_bytes, "Receipt served");

    let disposition = format!(
        "inline; filename=\"receipt-{}.pdf\"",
        sale.sale().receipt_number
    );
    Ok((
        [
            (header::CONTENT_TYPE, receipt.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        receipt.content,
    )
        .into_response())
}
