//! Payment gateway notification payloads.
//!
//! Only the fields the fulfillment path needs are captured; everything else in
//! the gateway's event schema is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::money::Currency;
use super::webhook_errors::WebhookError;
use crate::domain::foundation::{PackageId, PaymentIntentRef, UserId};

/// Metadata key carrying the purchasing user.
pub const METADATA_USER_ID: &str = "user_id";

/// Metadata key carrying the purchased package.
pub const METADATA_PACKAGE_ID: &str = "package_id";

/// Gateway event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: PaymentEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

/// Payment intent object as embedded in `payment_intent.*` events.
#[derive(Debug, Clone, Deserialize)]
struct PaymentIntentObject {
    id: Option<String>,
    amount: Option<i64>,
    amount_received: Option<i64>,
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Event types the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventType {
    /// The charge completed. The only type that fulfills.
    PaymentIntentSucceeded,
    /// A payment attempt failed; the intent may still succeed later.
    PaymentIntentPaymentFailed,
    /// The intent was cancelled and will never succeed.
    PaymentIntentCanceled,
    /// Unknown or unhandled event type.
    Unknown,
}

impl PaymentEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentPaymentFailed,
            "payment_intent.canceled" => Self::PaymentIntentCanceled,
            _ => Self::Unknown,
        }
    }

    /// Convert to the gateway event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentPaymentFailed => "payment_intent.payment_failed",
            Self::PaymentIntentCanceled => "payment_intent.canceled",
            Self::Unknown => "unknown",
        }
    }
}

/// Correlation data pulled from a verified successful-payment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SucceededPayment {
    pub event_id: String,
    pub payment_intent_ref: PaymentIntentRef,
    pub user_id: UserId,
    pub package_id: PackageId,
    /// Amount actually charged, when the gateway reports it.
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
}

impl PaymentEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> PaymentEventType {
        PaymentEventType::parse(&self.event_type)
    }

    /// Extracts the correlation data from a `payment_intent.succeeded` event.
    ///
    /// # Errors
    ///
    /// - `Ignored` for any other event type
    /// - `MissingField` / `ParseError` for a malformed payment intent object
    /// - `MissingMetadata` when the user or package metadata is absent or blank
    pub fn succeeded_payment(&self) -> Result<SucceededPayment, WebhookError> {
        if self.parsed_type() != PaymentEventType::PaymentIntentSucceeded {
            return Err(WebhookError::Ignored(self.event_type.clone()));
        }

        let intent: PaymentIntentObject = serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::ParseError(format!("payment intent: {}", e)))?;

        let payment_intent_ref = intent
            .id
            .as_deref()
            .and_then(|id| PaymentIntentRef::new(id).ok())
            .ok_or(WebhookError::MissingField("data.object.id"))?;

        let user_id = intent
            .metadata
            .get(METADATA_USER_ID)
            .and_then(|v| UserId::new(v.as_str()).ok())
            .ok_or(WebhookError::MissingMetadata(METADATA_USER_ID))?;

        let package_id = intent
            .metadata
            .get(METADATA_PACKAGE_ID)
            .and_then(|v| PackageId::new(v.as_str()).ok())
            .ok_or(WebhookError::MissingMetadata(METADATA_PACKAGE_ID))?;

        let currency = intent
            .currency
            .as_deref()
            .map(Currency::new)
            .transpose()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(SucceededPayment {
            event_id: self.id.clone(),
            payment_intent_ref,
            user_id,
            package_id,
            amount_minor: intent.amount_received.or(intent.amount),
            currency,
        })
    }
}
