//! HTTP handlers for entitlement endpoints.
//!
//! These handlers connect Axum routes to the entitlement command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::entitlement::{
    GetActiveBalanceHandler, GetActiveBalanceQuery, GetPaymentStatusHandler,
    GetPaymentStatusQuery, HandlePaymentNotificationCommand, HandlePaymentNotificationHandler,
    IssueEntitlementCommand, IssueEntitlementHandler, OperationTimeouts,
};
use crate::domain::entitlement::{EntitlementError, WebhookError};
use crate::domain::foundation::{PackageId, PaymentIntentRef, UserId};
use crate::ports::{
    EntitlementReader, EntitlementRepository, IdentityDirectory, PackageCatalog, PaymentGateway,
};

use super::dto::{
    BalanceResponse, CheckoutRequest, CheckoutResponse, ErrorResponse, PaymentStatusResponse,
    WebhookAck,
};

/// Header carrying the gateway's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Header carrying the caller identity, set by the upstream auth proxy.
pub const USER_ID_HEADER: &str = "X-User-Id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct EntitlementAppState {
    pub identity_directory: Arc<dyn IdentityDirectory>,
    pub package_catalog: Arc<dyn PackageCatalog>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub entitlement_repository: Arc<dyn EntitlementRepository>,
    pub entitlement_reader: Arc<dyn EntitlementReader>,
    pub timeouts: OperationTimeouts,
}

impl EntitlementAppState {
    pub fn issue_entitlement_handler(&self) -> IssueEntitlementHandler {
        IssueEntitlementHandler::new(
            self.identity_directory.clone(),
            self.package_catalog.clone(),
            self.payment_gateway.clone(),
            self.entitlement_repository.clone(),
            self.timeouts,
        )
    }

    pub fn payment_notification_handler(&self) -> HandlePaymentNotificationHandler {
        HandlePaymentNotificationHandler::new(
            self.payment_gateway.clone(),
            self.package_catalog.clone(),
            self.entitlement_repository.clone(),
            self.timeouts,
        )
    }

    pub fn active_balance_handler(&self) -> GetActiveBalanceHandler {
        GetActiveBalanceHandler::new(self.entitlement_reader.clone(), self.timeouts)
    }

    pub fn payment_status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.entitlement_reader.clone(), self.timeouts)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// Sessions are terminated upstream; the proxy forwards the verified user id
/// in `X-User-Id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/entitlements/balance - Spendable credits for the current user
pub async fn get_balance(
    State(state): State<EntitlementAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let handler = state.active_balance_handler();
    let query = GetActiveBalanceQuery {
        user_id: user.user_id,
    };

    let balance = handler.handle(query).await?;

    Ok(Json(BalanceResponse::from(balance)))
}

/// GET /api/entitlements/payments/:payment_intent_ref - Poll a payment's entitlement
pub async fn get_payment_status(
    State(state): State<EntitlementAppState>,
    user: AuthenticatedUser,
    Path(payment_intent_ref): Path<String>,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let handler = state.payment_status_handler();
    let query = GetPaymentStatusQuery {
        user_id: user.user_id,
        payment_intent_ref: PaymentIntentRef::new(payment_intent_ref)
            .map_err(EntitlementError::from)?,
    };

    let view = handler.handle(query).await?;

    Ok(Json(PaymentStatusResponse::from(view)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/entitlements/checkout - Start checkout for a credit package
pub async fn create_checkout(
    State(state): State<EntitlementAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, EntitlementApiError> {
    let handler = state.issue_entitlement_handler();
    let cmd = IssueEntitlementCommand {
        user_id: user.user_id,
        package_id: PackageId::new(request.package_id).map_err(EntitlementError::from)?,
    };

    let result = handler.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(result))))
}

/// POST /api/webhooks/payments - Gateway payment notifications
///
/// No user authentication; the signature over the raw body is the only
/// credential. The body must not be parsed before it is verified.
pub async fn handle_payment_webhook(
    State(state): State<EntitlementAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.payment_notification_handler();
    let cmd = HandlePaymentNotificationCommand {
        payload: body.to_vec(),
        signature,
    };

    let result = handler.handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAck::from(&result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts entitlement errors to HTTP responses.
#[derive(Debug)]
pub struct EntitlementApiError(EntitlementError);

impl From<EntitlementError> for EntitlementApiError {
    fn from(err: EntitlementError) -> Self {
        Self(err)
    }
}

impl EntitlementApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            EntitlementError::PackageNotFound(_)
            | EntitlementError::UnknownUser(_)
            | EntitlementError::NotFound(_) => StatusCode::NOT_FOUND,
            EntitlementError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            EntitlementError::InvalidState { .. } => StatusCode::CONFLICT,
            EntitlementError::Gateway {
                retryable: false, ..
            } => StatusCode::BAD_GATEWAY,
            EntitlementError::PartialFailure { .. }
            | EntitlementError::Gateway { .. }
            | EntitlementError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            EntitlementError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EntitlementApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "Entitlement request failed");
        }

        let mut body = ErrorResponse::new(self.0.code(), self.0.message())
            .retryable(self.0.is_retryable());
        if let EntitlementError::ValidationFailed { field, .. } = &self.0 {
            body = body.with_details(serde_json::json!({ "field": field }));
        }
        (status, Json(body)).into_response()
    }
}

/// API error type for the webhook endpoint.
///
/// The status code tells the gateway whether to redeliver: 4xx never, 5xx yes.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::new(self.0.code(), self.0.to_string())
            .retryable(self.0.is_retryable());
        (status, Json(body)).into_response()
    }
}
