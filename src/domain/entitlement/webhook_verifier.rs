//! Payment webhook signature verification.
//!
//! Verifies gateway signatures with HMAC-SHA256 over the raw request body and
//! rejects stale or future-dated signatures to limit replay.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::payment_event::PaymentEvent;
use super::webhook_errors::WebhookError;
use crate::domain::foundation::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook signatures (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future signatures (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// Every `v1` signature present. The gateway sends several while a secret
    /// is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<hex>[,v1=<hex>][,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // Legacy schemes and unknown keys carry no authority.
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for gateway webhook signatures.
pub struct PaymentWebhookVerifier {
    /// The webhook signing secret (`whsec_...`).
    secret: SecretString,
    /// Maximum accepted signature age in seconds.
    tolerance_secs: i64,
}

impl PaymentWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides the replay window.
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies the signature against the current time and parses the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, Timestamp::now())
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within acceptable range
    /// 3. Compute expected signature over the raw bytes
    /// 4. Compare signatures using constant-time comparison
    /// 5. Parse the JSON payload into a PaymentEvent
    ///
    /// Nothing is parsed from the body until step 4 has passed.
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: Timestamp,
    ) -> Result<PaymentEvent, WebhookError> {
        // 1. Parse signature header
        let header = SignatureHeader::parse(signature_header)?;

        // 2. Validate timestamp
        self.validate_timestamp(header.timestamp, now)?;

        // 3. Compute expected signature
        let expected = self.compute_signature(header.timestamp, payload)?;

        // 4. Compare signatures (constant-time)
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        // 5. Parse event
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn validate_timestamp(&self, timestamp: i64, now: Timestamp) -> Result<(), WebhookError> {
        // `t=` is attacker-controlled and read before the signature is checked.
        let age = now
            .as_unix_secs()
            .checked_sub(timestamp)
            .ok_or(WebhookError::InvalidTimestamp)?;

        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }
        Ok(())
    }

    /// HMAC-SHA256 over `"{timestamp}.{raw body}"`.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// Signature length is public (always 32 bytes), so the early length check
/// leaks nothing.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a valid signature header for `payload`, for use in test fixtures.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let verifier = PaymentWebhookVerifier::new(SecretString::new(secret.to_string()));
    let signature = verifier
        .compute_signature(timestamp, payload)
        .expect("HMAC accepts keys of any length");
    format!("t={},v1={}", timestamp, hex::encode(signature))
}
