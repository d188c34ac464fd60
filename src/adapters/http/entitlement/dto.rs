//! Data Transfer Objects for entitlement HTTP endpoints.
//!
//! These types define the JSON request/response structure for the REST API.
//! They are separate from domain types to allow independent evolution.

use serde::{Deserialize, Serialize};

use crate::application::handlers::entitlement::{
    HandlePaymentNotificationResult, IssueEntitlementResult,
};
use crate::domain::entitlement::CreditBalance;
use crate::domain::foundation::Timestamp;
use crate::ports::EntitlementView;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start checkout for a credit package.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub package_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a started checkout.
///
/// The client confirms the payment with `client_payment_token`; credits follow
/// once the gateway reports success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub entitlement_id: String,
    pub payment_intent_ref: String,
    pub client_payment_token: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
}

impl From<IssueEntitlementResult> for CheckoutResponse {
    fn from(result: IssueEntitlementResult) -> Self {
        Self {
            entitlement_id: result.entitlement_id.to_string(),
            payment_intent_ref: result.payment_intent_ref.to_string(),
            client_payment_token: result.client_payment_token,
            status: result.status.as_str().to_string(),
            amount_minor: result.amount_minor,
            currency: result.currency.as_str().to_string(),
        }
    }
}

/// Spendable credit balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub base_remaining: u64,
    pub bonus_remaining: u64,
    pub total_remaining: u64,
    pub featured: bool,
    pub earliest_expiry: Option<Timestamp>,
}

impl From<CreditBalance> for BalanceResponse {
    fn from(balance: CreditBalance) -> Self {
        Self {
            base_remaining: balance.base_remaining,
            bonus_remaining: balance.bonus_remaining,
            total_remaining: balance.total(),
            featured: balance.featured,
            earliest_expiry: balance.earliest_expiry,
        }
    }
}

/// Entitlement behind a payment, as seen by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub entitlement_id: String,
    pub payment_intent_ref: String,
    pub package_id: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
    pub base_credits: u32,
    pub bonus_credits: u32,
    pub featured: bool,
    pub created_at: Timestamp,
    pub activated_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl From<EntitlementView> for PaymentStatusResponse {
    fn from(view: EntitlementView) -> Self {
        Self {
            entitlement_id: view.id.to_string(),
            payment_intent_ref: view.payment_intent_ref.to_string(),
            package_id: view.package_id.to_string(),
            status: view.status.as_str().to_string(),
            amount_minor: view.amount_minor,
            currency: view.currency.as_str().to_string(),
            base_credits: view.base_credits,
            bonus_credits: view.bonus_credits,
            featured: view.featured,
            created_at: view.created_at,
            activated_at: view.activated_at,
            expires_at: view.expires_at,
        }
    }
}

/// Acknowledgement returned to the gateway for an accepted notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: String,
}

impl From<&HandlePaymentNotificationResult> for WebhookAck {
    fn from(result: &HandlePaymentNotificationResult) -> Self {
        Self {
            received: true,
            outcome: result.outcome().to_string(),
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Whether repeating the request may succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
            retryable: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::{Currency, EntitlementStatus};
    use crate::domain::foundation::{EntitlementId, PaymentIntentRef};

    // ════════════════════════════════════════════════════════════════════════════
    // Request Deserialization
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_request_deserializes() {
        let request: CheckoutRequest =
            serde_json::from_str(r#"{"package_id": "starter"}"#).unwrap();
        assert_eq!(request.package_id, "starter");
    }

    #[test]
    fn checkout_request_requires_package_id() {
        assert!(serde_json::from_str::<CheckoutRequest>("{}").is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response Serialization
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_response_uses_wire_names() {
        let response = CheckoutResponse::from(IssueEntitlementResult {
            entitlement_id: EntitlementId::new(),
            payment_intent_ref: PaymentIntentRef::new("pi_1").unwrap(),
            client_payment_token: "pi_1_secret".to_string(),
            status: EntitlementStatus::Pending,
            amount_minor: 4900,
            currency: Currency::new("usd").unwrap(),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["currency"], "usd");
        assert_eq!(json["amount_minor"], 4900);
        assert_eq!(json["client_payment_token"], "pi_1_secret");
    }

    #[test]
    fn balance_response_includes_total() {
        let response = BalanceResponse::from(CreditBalance {
            base_remaining: 5,
            bonus_remaining: 2,
            featured: true,
            earliest_expiry: None,
        });
        assert_eq!(response.total_remaining, 7);
    }

    #[test]
    fn webhook_ack_carries_outcome() {
        let ack = WebhookAck::from(&HandlePaymentNotificationResult::Ignored {
            event_type: "charge.refunded".to_string(),
        });
        assert!(ack.received);
        assert_eq!(ack.outcome, "ignored");
    }

    #[test]
    fn error_response_omits_unset_retryable() {
        let json = serde_json::to_string(&ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert!(!json.contains("retryable"));

        let json =
            serde_json::to_string(&ErrorResponse::new("TIMEOUT", "slow").retryable(true)).unwrap();
        assert!(json.contains(r#""retryable":true"#));
    }
}
