//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Stripe Payment Intents API.
//!
//! # Security
//!
//! - Webhook signatures are checked by `PaymentWebhookVerifier` (HMAC-SHA256,
//!   constant-time comparison, replay window)
//! - Test-mode events can be refused with `require_livemode`
//! - Secrets are held as `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret).with_require_livemode(true);
//! let gateway = StripePaymentGateway::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::entitlement::{
    PaymentEvent, PaymentWebhookVerifier, WebhookError, DEFAULT_TOLERANCE_SECS, METADATA_PACKAGE_ID,
    METADATA_USER_ID,
};
use crate::domain::foundation::PaymentIntentRef;
use crate::ports::{
    CreatePaymentIntentRequest, PaymentError, PaymentGateway, PaymentIntent,
};

/// Default Stripe API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API.
    api_base_url: String,

    /// Refuse events with `livemode: false`.
    require_livemode: bool,

    /// Maximum accepted webhook signature age.
    webhook_tolerance_secs: i64,
}

impl StripeConfig {
    pub fn new(api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            require_livemode: false,
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    pub fn with_webhook_tolerance_secs(mut self, secs: i64) -> Self {
        self.webhook_tolerance_secs = secs;
        self
    }
}

/// Stripe implementation of `PaymentGateway`.
pub struct StripePaymentGateway {
    api_key: SecretString,
    api_base_url: String,
    require_livemode: bool,
    verifier: PaymentWebhookVerifier,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> Self {
        let verifier = PaymentWebhookVerifier::new(config.webhook_secret)
            .with_tolerance_secs(config.webhook_tolerance_secs);
        Self {
            api_key: config.api_key,
            api_base_url: config.api_base_url,
            require_livemode: config.require_livemode,
            verifier,
            http_client: reqwest::Client::new(),
        }
    }

    fn check_livemode(&self, event: &PaymentEvent) -> Result<(), WebhookError> {
        if self.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Rejected test mode event in production");
            return Err(WebhookError::LivemodeMismatch);
        }
        Ok(())
    }
}

/// Form body for `POST /v1/payment_intents`.
fn intent_form_params(request: &CreatePaymentIntentRequest) -> Vec<(String, String)> {
    vec![
        ("amount".to_string(), request.amount_minor.to_string()),
        ("currency".to_string(), request.currency.as_str().to_string()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
        (
            format!("metadata[{}]", METADATA_USER_ID),
            request.metadata.user_id.to_string(),
        ),
        (
            format!("metadata[{}]", METADATA_PACKAGE_ID),
            request.metadata.package_id.to_string(),
        ),
    ]
}

/// Maps a non-2xx Stripe response to a `PaymentError`.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let parsed: Option<StripeErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let error = match status.as_u16() {
        401 | 403 => PaymentError::authentication(message),
        429 => PaymentError::rate_limited(message),
        400..=499 => PaymentError::invalid_request(message),
        _ => PaymentError::provider(message),
    };

    match parsed.and_then(|b| b.error.code) {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let url = format!("{}/v1/payment_intents", self.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .form(&intent_form_params(&request))
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, error = %error_text, "Stripe create_payment_intent failed");
            return Err(error_from_response(status, &error_text));
        }

        let intent: StripePaymentIntent = response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        let intent_ref = PaymentIntentRef::new(intent.id)
            .map_err(|e| PaymentError::provider(format!("Stripe returned no intent id: {}", e)))?;
        let client_token = intent
            .client_secret
            .ok_or_else(|| PaymentError::provider("Stripe returned no client secret"))?;

        tracing::info!(payment_intent = %intent_ref, amount = request.amount_minor, "Created payment intent");

        Ok(PaymentIntent {
            intent_ref,
            client_token,
        })
    }

    fn verify_notification(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<PaymentEvent, WebhookError> {
        let event = self.verifier.verify_and_parse(payload, signature)?;
        self.check_livemode(&event)?;
        Ok(event)
    }
}
