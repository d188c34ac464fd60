//! Entitlement-specific error types.
//!
//! Errors surfaced by issuance and the read paths. Webhook processing has its
//! own taxonomy in `webhook_errors`.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | PackageNotFound | 404 |
//! | UnknownUser | 404 |
//! | NotFound | 404 |
//! | ValidationFailed | 400 |
//! | InvalidState | 409 |
//! | PartialFailure | 503 |
//! | Gateway | 502 / 503 |
//! | Timeout | 503 |
//! | Infrastructure | 500 |

use std::fmt;

use crate::domain::foundation::{
    DomainError, ErrorCode, PackageId, PaymentIntentRef, UserId, ValidationError,
};

/// Entitlement-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementError {
    /// Package is absent from the catalog or no longer on sale.
    PackageNotFound(PackageId),

    /// Caller identity is not known to the account service.
    UnknownUser(UserId),

    /// No entitlement matches the requested payment reference for this caller.
    NotFound(PaymentIntentRef),

    /// Request input failed validation.
    ValidationFailed { field: String, message: String },

    /// Attempted lifecycle transition is not allowed.
    InvalidState { current: String, attempted: String },

    /// The gateway intent exists but the local pending row was not written.
    PartialFailure {
        payment_intent_ref: PaymentIntentRef,
        reason: String,
    },

    /// The payment gateway rejected or failed the call.
    Gateway { message: String, retryable: bool },

    /// An external call exceeded its time budget.
    Timeout(&'static str),

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl EntitlementError {
    pub fn package_not_found(id: PackageId) -> Self {
        EntitlementError::PackageNotFound(id)
    }

    pub fn unknown_user(id: UserId) -> Self {
        EntitlementError::UnknownUser(id)
    }

    pub fn not_found(intent: PaymentIntentRef) -> Self {
        EntitlementError::NotFound(intent)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EntitlementError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        EntitlementError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn partial_failure(intent: PaymentIntentRef, reason: impl Into<String>) -> Self {
        EntitlementError::PartialFailure {
            payment_intent_ref: intent,
            reason: reason.into(),
        }
    }

    pub fn gateway(message: impl Into<String>, retryable: bool) -> Self {
        EntitlementError::Gateway {
            message: message.into(),
            retryable,
        }
    }

    pub fn timed_out(operation: &'static str) -> Self {
        EntitlementError::Timeout(operation)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        EntitlementError::Infrastructure(message.into())
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EntitlementError::PackageNotFound(_) => "PACKAGE_NOT_FOUND",
            EntitlementError::UnknownUser(_) => "UNKNOWN_USER",
            EntitlementError::NotFound(_) => "ENTITLEMENT_NOT_FOUND",
            EntitlementError::ValidationFailed { .. } => "VALIDATION_FAILED",
            EntitlementError::InvalidState { .. } => "INVALID_STATE_TRANSITION",
            EntitlementError::PartialFailure { .. } => "PARTIAL_FAILURE",
            EntitlementError::Gateway { .. } => "PAYMENT_GATEWAY_ERROR",
            EntitlementError::Timeout(_) => "TIMEOUT",
            EntitlementError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable message safe to show to the caller.
    pub fn message(&self) -> String {
        match self {
            EntitlementError::PackageNotFound(id) => {
                format!("Package '{}' is not available", id)
            }
            EntitlementError::UnknownUser(_) => "User is not known".to_string(),
            EntitlementError::NotFound(intent) => {
                format!("No entitlement found for payment '{}'", intent)
            }
            EntitlementError::ValidationFailed { field, message } => {
                format!("{}: {}", field, message)
            }
            EntitlementError::InvalidState { current, attempted } => {
                format!("Cannot {} an entitlement that is {}", attempted, current)
            }
            EntitlementError::PartialFailure { .. } => {
                "Could not start checkout, please try again".to_string()
            }
            EntitlementError::Gateway { .. } => {
                "Payment provider is unavailable, please try again".to_string()
            }
            EntitlementError::Timeout(_) => "Request timed out, please try again".to_string(),
            EntitlementError::Infrastructure(_) => "An internal error occurred".to_string(),
        }
    }

    /// True when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EntitlementError::PartialFailure { .. }
            | EntitlementError::Timeout(_)
            | EntitlementError::Infrastructure(_) => true,
            EntitlementError::Gateway { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl fmt::Display for EntitlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitlementError::PartialFailure {
                payment_intent_ref,
                reason,
            } => write!(
                f,
                "Pending entitlement for {} was not recorded: {}",
                payment_intent_ref, reason
            ),
            EntitlementError::Gateway { message, .. } => write!(f, "Gateway error: {}", message),
            EntitlementError::Timeout(op) => write!(f, "{} timed out", op),
            EntitlementError::Infrastructure(msg) => write!(f, "Infrastructure error: {}", msg),
            other => f.write_str(&other.message()),
        }
    }
}

impl std::error::Error for EntitlementError {}

impl From<ValidationError> for EntitlementError {
    fn from(err: ValidationError) -> Self {
        EntitlementError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for EntitlementError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => EntitlementError::ValidationFailed {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => {
                EntitlementError::invalid_state("unknown", err.message)
            }
            ErrorCode::Timeout => EntitlementError::Timeout("storage"),
            _ => EntitlementError::Infrastructure(err.to_string()),
        }
    }
}
