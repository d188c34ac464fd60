//! HTTP adapter for entitlement endpoints.
//!
//! - `POST /api/entitlements/checkout` - Start checkout for a credit package
//! - `GET /api/entitlements/balance` - Spendable credits for the current user
//! - `GET /api/entitlements/payments/:payment_intent_ref` - Poll a payment
//! - `POST /api/webhooks/payments` - Gateway payment notifications

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{
    AuthenticatedUser, EntitlementApiError, EntitlementAppState, WebhookApiError,
    SIGNATURE_HEADER, USER_ID_HEADER,
};
pub use routes::{entitlement_router, entitlement_routes, webhook_routes};
