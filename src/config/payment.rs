//! Payment gateway configuration (Stripe)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::stripe::{StripeConfig, DEFAULT_API_BASE_URL};
use crate::domain::entitlement::DEFAULT_TOLERANCE_SECS;

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (sk_...)
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret (whsec_...)
    pub stripe_webhook_secret: SecretString,

    /// Stripe API base URL, overridable for local gateway stubs
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Reject notifications whose livemode flag is false
    #[serde(default)]
    pub require_livemode: bool,

    /// Maximum age of a webhook signature timestamp
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    /// Gateway adapter settings derived from this section.
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(
            self.stripe_api_key.clone(),
            self.stripe_webhook_secret.clone(),
        )
        .with_base_url(self.api_base_url.clone())
        .with_require_livemode(self.require_livemode)
        .with_webhook_tolerance_secs(self.webhook_tolerance_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.require_livemode && !self.is_live_mode() {
            return Err(ValidationError::LiveKeyRequired);
        }
        if production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::StripeBaseUrlMustBeHttps);
        }
        if !(1..=3600).contains(&self.webhook_tolerance_secs) {
            return Err(ValidationError::InvalidWebhookTolerance);
        }

        Ok(())
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_webhook_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}
