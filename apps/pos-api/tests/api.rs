//! End-to-end tests of the HTTP surface over the in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tally_core::{Money, ProductSnapshot, TaxRate};
use tally_receipt::ReceiptGenerator;
use tally_sales::{MemoryCatalog, MemorySaleStore, SaleService, SaleServiceConfig};
use tower::ServiceExt;

use pos_api::{build_router, AppState};

const PRODUCT_ID: &str = "5b0c8e2a-7a7d-4f6e-9d55-3c1f2e4a6b70";

fn catalog() -> MemoryCatalog {
    MemoryCatalog::with_products([ProductSnapshot {
        product_id: PRODUCT_ID.to_string(),
        name: "Espresso machine descaler".to_string(),
        sku: "DESC-01".to_string(),
        unit_label: "un".to_string(),
        unit_price: Money::from_cents(12000),
        tax_rate: TaxRate::from_bps(1000),
    }])
}

fn app_with(store: Arc<MemorySaleStore>, config: SaleServiceConfig) -> Router {
    let service = SaleService::new(store, Arc::new(catalog()), config);
    build_router(AppState::new(service, ReceiptGenerator::default()))
}

fn app() -> Router {
    app_with(Arc::new(MemorySaleStore::new()), SaleServiceConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn open(app: &Router) -> String {
    let (status, sale) = send_json(app, "POST", "/sales", Some(json!({"operatorId": "op-1"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    sale["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send_json(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_full_sale_over_http() {
    let app = app();
    let id = open(&app).await;

    let (status, sale) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/items"),
        Some(json!({
            "productId": PRODUCT_ID,
            "quantity": 2,
            "unitPrice": "120",
            "discountValue": 10,
            "taxValue": "5"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "open");
    assert_eq!(sale["totalNet"], "235.00");
    assert_eq!(sale["balanceDue"], "235.00");
    assert_eq!(sale["items"][0]["sku"], "DESC-01");

    let (status, sale) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cash", "amount": 240})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "pending_payment");
    assert_eq!(sale["totalPaid"], "240.00");
    assert_eq!(sale["balanceDue"], "0.00");
    assert_eq!(sale["changeDue"], "0.00");

    // No receipt before completion.
    let (status, error) = send_json(&app, "GET", &format!("/sales/{id}/receipt"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "invalid_state");

    let (status, sale) = send_json(&app, "POST", &format!("/sales/{id}/finalize"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "completed");
    assert_eq!(sale["changeDue"], "5.00");
    assert!(sale["closedAt"].is_string());

    let request = Request::builder()
        .uri(format!("/sales/{id}/receipt"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let (status, error) = send_json(&app, "POST", &format!("/sales/{id}/finalize"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "invalid_state");

    let (status, fetched) = send_json(&app, "GET", &format!("/sales/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["changeDue"], "5.00");
    assert_eq!(fetched["closedAt"], sale["closedAt"]);
}

#[tokio::test]
async fn test_insufficient_payment_is_422() {
    let app = app();
    let id = open(&app).await;

    send_json(
        &app,
        "POST",
        &format!("/sales/{id}/items"),
        Some(json!({"productId": PRODUCT_ID, "quantity": "1"})),
    )
    .await;

    let (status, error) = send_json(&app, "POST", &format!("/sales/{id}/finalize"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "insufficient_payment");

    let (_, sale) = send_json(&app, "GET", &format!("/sales/{id}"), None).await;
    assert_eq!(sale["status"], "open");
    assert_eq!(sale["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_sale_finalizes() {
    let app = app();
    let id = open(&app).await;

    let (status, sale) = send_json(&app, "POST", &format!("/sales/{id}/finalize"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "completed");
    assert_eq!(sale["changeDue"], "0.00");
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let app = app();
    let id = open(&app).await;

    let (status, error) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/items"),
        Some(json!({"productId": PRODUCT_ID, "quantity": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cheque", "amount": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cash", "amount": "-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing required field.
    let (status, error) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"amount": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");

    let (status, _) = send_json(&app, "POST", "/sales", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_amounts_past_money_range_are_400() {
    let app = app();
    let id = open(&app).await;

    let (status, error) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/items"),
        Some(json!({
            "productId": PRODUCT_ID,
            "quantity": 2,
            "unitPrice": "90000000000000000"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/items"),
        Some(json!({
            "productId": PRODUCT_ID,
            "quantity": 2,
            "unitPrice": "9999999999.99"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sale) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cash", "amount": "9999999999.99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["totalPaid"], "9999999999.99");

    let (status, error) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cash", "amount": "9999999999.99"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");

    let (_, sale) = send_json(&app, "GET", &format!("/sales/{id}"), None).await;
    assert!(sale["items"].as_array().unwrap().is_empty());
    assert_eq!(sale["payments"].as_array().unwrap().len(), 1);
    assert_eq!(sale["totalPaid"], "9999999999.99");
    assert_eq!(sale["totalGross"], "0.00");
}

#[tokio::test]
async fn test_operator_header_is_used() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/sales")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-operator-id", "op-header")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let sale: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(sale["operatorId"], "op-header");
}

#[tokio::test]
async fn test_unknown_sale_and_product_are_404() {
    let app = app();

    let (status, error) = send_json(&app, "GET", "/sales/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "not_found");

    let id = open(&app).await;
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/items"),
        Some(json!({"productId": "missing", "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancelled_sale_rejects_mutations() {
    let app = app();
    let id = open(&app).await;

    let (status, sale) = send_json(&app, "POST", &format!("/sales/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "cancelled");

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cash", "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_json(&app, "GET", &format!("/sales/{id}/receipt"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_exhausted_retries_are_503_with_generic_message() {
    let store = Arc::new(MemorySaleStore::new());
    let app = app_with(
        Arc::clone(&store),
        SaleServiceConfig {
            max_attempts: 2,
            retry_backoff_ms: 1,
            ..Default::default()
        },
    );
    let id = open(&app).await;

    store.fail_next_commits(2);
    let (status, error) = send_json(
        &app,
        "POST",
        &format!("/sales/{id}/payments"),
        Some(json!({"method": "cash", "amount": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["error"], "storage_error");
    assert!(!error["message"].as_str().unwrap().contains("injected"));

    let (_, sale) = send_json(&app, "GET", &format!("/sales/{id}"), None).await;
    assert_eq!(sale["payments"].as_array().unwrap().len(), 0);
}
