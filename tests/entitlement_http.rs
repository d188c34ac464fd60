//! Integration tests for the entitlement HTTP surface.
//!
//! Sends real requests through the full router (`/health`, `/api/...`) backed
//! by the in-memory adapters and a signature-checking mock gateway.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use listing_credits::adapters::http::entitlement::{SIGNATURE_HEADER, USER_ID_HEADER};
use listing_credits::adapters::http::{app_router, EntitlementAppState};
use listing_credits::adapters::memory::{
    InMemoryEntitlementStore, InMemoryIdentityDirectory, InMemoryPackageCatalog,
};
use listing_credits::adapters::stripe::MockPaymentGateway;
use listing_credits::application::OperationTimeouts;
use listing_credits::domain::entitlement::{sign_payload, Currency, Package};
use listing_credits::domain::foundation::{PackageId, Timestamp, UserId};

// =============================================================================
// Test Infrastructure
// =============================================================================

const SECRET: &str = "whsec_http";

fn app() -> (Router, Arc<InMemoryEntitlementStore>) {
    let store = Arc::new(InMemoryEntitlementStore::new());
    let starter = Package {
        id: PackageId::new("starter").unwrap(),
        price: dec!(49.00),
        currency: Currency::new("usd").unwrap(),
        base_credits: 5,
        bonus_credits: 2,
        validity_days: 7,
        featured: true,
        is_active: true,
    };
    let state = EntitlementAppState {
        identity_directory: Arc::new(InMemoryIdentityDirectory::with_users([
            UserId::new("alice").unwrap(),
            UserId::new("bob").unwrap(),
        ])),
        package_catalog: Arc::new(InMemoryPackageCatalog::with_packages([starter]).unwrap()),
        payment_gateway: Arc::new(MockPaymentGateway::with_webhook_secret(SECRET)),
        entitlement_repository: store.clone(),
        entitlement_reader: store.clone(),
        timeouts: OperationTimeouts::default(),
    };
    (app_router(state), store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(USER_ID_HEADER, user)
        .body(Body::empty())
        .unwrap()
}

fn checkout(user: &str, package_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/entitlements/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .header(USER_ID_HEADER, user)
        .body(Body::from(json!({ "package_id": package_id }).to_string()))
        .unwrap()
}

fn webhook(payload: Vec<u8>, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(payload)).unwrap()
}

fn succeeded(intent: &str, user: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", intent),
        "type": "payment_intent.succeeded",
        "created": Timestamp::now().as_unix_secs(),
        "data": { "object": {
            "id": intent,
            "amount": 4900,
            "currency": "usd",
            "metadata": { "user_id": user, "package_id": "starter" }
        }}
    }))
    .unwrap()
}

fn sign(payload: &[u8]) -> Option<String> {
    Some(sign_payload(SECRET, Timestamp::now().as_unix_secs(), payload))
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

// =============================================================================
// Checkout to Balance
// =============================================================================

#[tokio::test]
async fn full_purchase_flow() {
    let (app, _) = app();

    let (status, body) = send(&app, checkout("alice", "starter")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["amount_minor"], 4900);
    let intent = body["payment_intent_ref"].as_str().unwrap().to_string();

    let (_, balance) = send(&app, get("/api/entitlements/balance", "alice")).await;
    assert_eq!(balance["total_remaining"], 0);

    let payload = succeeded(&intent, "alice");
    let (status, ack) = send(&app, webhook(payload.clone(), sign(&payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "activated");

    let (status, ack) = send(&app, webhook(payload.clone(), sign(&payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "already_processed");

    let (status, balance) = send(&app, get("/api/entitlements/balance", "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["base_remaining"], 5);
    assert_eq!(balance["bonus_remaining"], 2);
    assert_eq!(balance["featured"], true);
    assert!(!balance["earliest_expiry"].is_null());

    let (status, payment) = send(
        &app,
        get(&format!("/api/entitlements/payments/{}", intent), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "active");
    assert_eq!(payment["base_credits"], 5);
}

#[tokio::test]
async fn payment_status_is_private_to_the_payer() {
    let (app, _) = app();
    let (_, body) = send(&app, checkout("alice", "starter")).await;
    let intent = body["payment_intent_ref"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        get(&format!("/api/entitlements/payments/{}", intent), "bob"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "ENTITLEMENT_NOT_FOUND");
}

// =============================================================================
// Request Validation
// =============================================================================

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/api/entitlements/balance")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn unknown_user_cannot_check_out() {
    let (app, store) = app();
    let (status, body) = send(&app, checkout("mallory", "starter")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "UNKNOWN_USER");
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn unknown_package_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, checkout("alice", "platinum")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "PACKAGE_NOT_FOUND");
    assert_eq!(body["retryable"], false);
}

// =============================================================================
// Webhook Authenticity
// =============================================================================

#[tokio::test]
async fn unsigned_webhook_is_rejected_without_effect() {
    let (app, store) = app();
    let (status, body) = send(&app, webhook(succeeded("pi_x", "alice"), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "MISSING_SIGNATURE");
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn forged_webhook_is_unauthorized() {
    let (app, store) = app();
    let payload = succeeded("pi_x", "alice");
    let forged = Some(sign_payload(
        "whsec_other",
        Timestamp::now().as_unix_secs(),
        &payload,
    ));

    let (status, body) = send(&app, webhook(payload, forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "INVALID_WEBHOOK_SIGNATURE");
    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn webhook_for_unknown_package_is_unprocessable() {
    let (app, store) = app();
    let payload = serde_json::to_vec(&json!({
        "id": "evt_gone",
        "type": "payment_intent.succeeded",
        "created": Timestamp::now().as_unix_secs(),
        "data": { "object": {
            "id": "pi_gone",
            "amount": 100,
            "currency": "usd",
            "metadata": { "user_id": "alice", "package_id": "discontinued" }
        }}
    }))
    .unwrap();

    let (status, body) = send(&app, webhook(payload.clone(), sign(&payload))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "UNKNOWN_PACKAGE");
    assert_eq!(store.count().await, 0);
}
