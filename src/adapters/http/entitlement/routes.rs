//! Axum router configuration for entitlement endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_checkout, get_balance, get_payment_status, handle_payment_webhook,
    EntitlementAppState,
};

/// Create the entitlement API router.
///
/// # Routes (require authentication)
/// - `POST /checkout` - Start checkout for a credit package
/// - `GET /balance` - Spendable credits for the current user
/// - `GET /payments/:payment_intent_ref` - Entitlement behind a payment
pub fn entitlement_routes() -> Router<EntitlementAppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/balance", get(get_balance))
        .route("/payments/:payment_intent_ref", get(get_payment_status))
}

/// Create the payment webhook router.
///
/// Separate from the entitlement routes because webhooks carry no user
/// session; they are authenticated by signature.
///
/// # Routes
/// - `POST /payments` - Gateway payment notifications
pub fn webhook_routes() -> Router<EntitlementAppState> {
    Router::new().route("/payments", post(handle_payment_webhook))
}

/// Combined router, suitable for nesting under `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", entitlement_router())
///     .with_state(app_state);
/// ```
pub fn entitlement_router() -> Router<EntitlementAppState> {
    Router::new()
        .nest("/entitlements", entitlement_routes())
        .nest("/webhooks", webhook_routes())
}
