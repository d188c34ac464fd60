//! Webhook error types for payment notification handling.
//!
//! Defines all error conditions that can occur while processing a gateway
//! notification, with HTTP status code mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No signature header accompanied the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse webhook payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required correlation metadata missing from an authentic event.
    #[error("Missing metadata: {0}")]
    MissingMetadata(&'static str),

    /// Required field missing from webhook payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Event mode does not match the deployment (test event in live mode).
    #[error("Livemode mismatch")]
    LivemodeMismatch,

    /// Metadata names a package the catalog no longer knows.
    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    /// Event was intentionally ignored (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Entitlement store operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An external call exceeded its time budget.
    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl WebhookError {
    /// Returns true if the gateway should redeliver this notification.
    ///
    /// Only failures that happen after authentication and before commit are
    /// retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Catalog(_) | WebhookError::Database(_) | WebhookError::Timeout(_)
        )
    }

    /// True for failures that may indicate forged or replayed traffic.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes determine the gateway's retry behavior:
    /// - 2xx: Event acknowledged, no retry
    /// - 4xx: Permanent rejection, no retry
    /// - 5xx: Transient failure, will retry
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures - don't retry
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Bad request - don't retry
            WebhookError::MissingSignature
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingMetadata(_)
            | WebhookError::MissingField(_)
            | WebhookError::LivemodeMismatch => StatusCode::BAD_REQUEST,

            // Authentic but unfulfillable - don't retry
            WebhookError::UnknownPackage(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // Ignored events are acknowledged as success
            WebhookError::Ignored(_) => StatusCode::OK,

            // Server errors - will retry
            WebhookError::Catalog(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_WEBHOOK_SIGNATURE",
            WebhookError::TimestampOutOfRange | WebhookError::InvalidTimestamp => {
                "INVALID_WEBHOOK_TIMESTAMP"
            }
            WebhookError::ParseError(_) | WebhookError::MissingField(_) => "MALFORMED_EVENT",
            WebhookError::MissingMetadata(_) => "MISSING_METADATA",
            WebhookError::LivemodeMismatch => "LIVEMODE_MISMATCH",
            WebhookError::UnknownPackage(_) => "UNKNOWN_PACKAGE",
            WebhookError::Ignored(_) => "IGNORED",
            WebhookError::Catalog(_) | WebhookError::Database(_) => "INTERNAL_ERROR",
            WebhookError::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn missing_metadata_displays_field_name() {
        let err = WebhookError::MissingMetadata("package_id");
        assert_eq!(format!("{}", err), "Missing metadata: package_id");
    }

    #[test]
    fn timeout_displays_operation() {
        let err = WebhookError::Timeout("entitlement store");
        assert_eq!(format!("{}", err), "entitlement store timed out");
    }

    // ══════════════════════════════════════════════════════════════
    // Retryability
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn storage_and_timeouts_are_retryable() {
        assert!(WebhookError::Database("connection refused".into()).is_retryable());
        assert!(WebhookError::Catalog("pool exhausted".into()).is_retryable());
        assert!(WebhookError::Timeout("entitlement store").is_retryable());
    }

    #[test]
    fn authenticity_and_correlation_failures_are_permanent() {
        for err in [
            WebhookError::MissingSignature,
            WebhookError::InvalidSignature,
            WebhookError::TimestampOutOfRange,
            WebhookError::ParseError("bad json".into()),
            WebhookError::MissingMetadata("user_id"),
            WebhookError::UnknownPackage("gone".into()),
        ] {
            assert!(!err.is_retryable(), "{:?} should not be retryable", err);
            assert!(err.status_code().is_client_error(), "{:?} should be 4xx", err);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Status Codes
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_signature_returns_401() {
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn retryable_errors_return_5xx() {
        assert!(WebhookError::Database("x".into()).status_code().is_server_error());
        assert!(WebhookError::Timeout("x").status_code().is_server_error());
    }

    #[test]
    fn ignored_returns_200() {
        assert_eq!(
            WebhookError::Ignored("payment_intent.created".into()).status_code(),
            StatusCode::OK
        );
    }

    #[test]
    fn security_events_are_flagged() {
        assert!(WebhookError::InvalidSignature.is_security_event());
        assert!(!WebhookError::MissingMetadata("user_id").is_security_event());
    }

    #[test]
    fn domain_error_becomes_database_error() {
        let err: WebhookError = DomainError::database("deadlock").into();
        assert!(matches!(err, WebhookError::Database(_)));
    }
}
