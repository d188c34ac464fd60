//! Mock payment gateway for testing.
//!
//! Configurable stand-in for `PaymentGateway`. Supports:
//! - Error injection
//! - Artificial latency (for timeout tests)
//! - Call tracking
//! - Real signature checks when given a webhook secret

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::entitlement::{PaymentEvent, PaymentWebhookVerifier, WebhookError};
use crate::domain::foundation::PaymentIntentRef;
use crate::ports::{CreatePaymentIntentRequest, PaymentError, PaymentGateway, PaymentIntent};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::with_webhook_secret("whsec_test");
/// gateway.fail_next(PaymentError::network("down"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Error to return on the next `create_payment_intent` call.
    next_error: Option<PaymentError>,

    /// Sleep before answering `create_payment_intent`.
    delay: Option<Duration>,

    /// Requests seen by `create_payment_intent`.
    created: Vec<CreatePaymentIntentRequest>,

    /// When set, notifications must carry a valid signature for this secret.
    webhook_secret: Option<String>,

    /// Reject every notification.
    reject_notifications: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify notifications against `secret` instead of accepting them blindly.
    pub fn with_webhook_secret(secret: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.lock().webhook_secret = Some(secret.into());
        mock
    }

    /// Fail every notification with `InvalidSignature`.
    pub fn rejecting_notifications() -> Self {
        let mock = Self::new();
        mock.lock().reject_notifications = true;
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn fail_next(&self, error: PaymentError) {
        self.lock().next_error = Some(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Helpers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn created_intents(&self) -> Vec<CreatePaymentIntentRequest> {
        self.lock().created.clone()
    }

    pub fn intent_count(&self) -> usize {
        self.lock().created.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        state.created.push(request);
        let n = state.created.len();

        let intent_ref = PaymentIntentRef::new(format!("pi_mock_{}", n))
            .map_err(|e| PaymentError::provider(e.to_string()))?;
        Ok(PaymentIntent {
            client_token: format!("{}_secret_mock", intent_ref),
            intent_ref,
        })
    }

    fn verify_notification(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, WebhookError> {
        let state = self.lock();
        if state.reject_notifications {
            return Err(WebhookError::InvalidSignature);
        }
        match &state.webhook_secret {
            Some(secret) => PaymentWebhookVerifier::new(SecretString::new(secret.clone()))
                .verify_and_parse(payload, signature),
            None => serde_json::from_slice(payload)
                .map_err(|e| WebhookError::ParseError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::{sign_payload, Currency};
    use crate::domain::foundation::{PackageId, Timestamp, UserId};
    use crate::ports::PaymentMetadata;

    fn request() -> CreatePaymentIntentRequest {
        CreatePaymentIntentRequest {
            amount_minor: 1000,
            currency: Currency::new("usd").unwrap(),
            metadata: PaymentMetadata {
                user_id: UserId::new("u1").unwrap(),
                package_id: PackageId::new("p1").unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn issues_sequential_intent_refs() {
        let mock = MockPaymentGateway::new();
        let a = mock.create_payment_intent(request()).await.unwrap();
        let b = mock.create_payment_intent(request()).await.unwrap();
        assert_eq!(a.intent_ref.as_str(), "pi_mock_1");
        assert_eq!(b.intent_ref.as_str(), "pi_mock_2");
        assert_eq!(mock.intent_count(), 2);
    }

    #[tokio::test]
    async fn injected_error_is_returned_once() {
        let mock = MockPaymentGateway::new();
        mock.fail_next(PaymentError::network("down"));
        assert!(mock.create_payment_intent(request()).await.is_err());
        assert!(mock.create_payment_intent(request()).await.is_ok());
        assert_eq!(mock.intent_count(), 1);
    }

    #[test]
    fn secret_mode_checks_signatures() {
        let mock = MockPaymentGateway::with_webhook_secret("whsec_x");
        let body = br#"{"id":"evt_1","type":"payment_intent.succeeded","created":0,"data":{"object":{}}}"#;
        let good = sign_payload("whsec_x", Timestamp::now().as_unix_secs(), body);
        let bad = sign_payload("whsec_y", Timestamp::now().as_unix_secs(), body);
        assert!(mock.verify_notification(body, &good).is_ok());
        assert!(matches!(
            mock.verify_notification(body, &bad),
            Err(WebhookError::InvalidSignature)
        ));
    }
}
