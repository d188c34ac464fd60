//! HTTP adapters - REST API implementations.

pub mod entitlement;

use axum::{routing::get, Router};

pub use entitlement::{entitlement_router, EntitlementAppState};

/// GET /health - Liveness probe
pub async fn health() -> &'static str {
    "OK"
}

/// Full application router: the API under `/api` plus `/health`.
pub fn app_router(state: EntitlementAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", entitlement_router())
        .with_state(state)
}
