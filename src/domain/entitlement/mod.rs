//! Entitlement domain module.
//!
//! Listing-credit entitlements: issuance as `pending`, exactly-once fulfillment
//! from verified gateway notifications, and the spendable balance view.
//!
//! # Module Structure
//!
//! - `aggregate` - Entitlement aggregate entity
//! - `status` - EntitlementStatus state machine
//! - `package` - Catalog package and the credit grant it confers
//! - `money` - Currency codes and minor-unit conversion
//! - `balance` - Spendable balance aggregation
//! - `payment_event` - Gateway notification payloads
//! - `webhook_verifier` - HMAC signature verification
//! - `webhook_errors` / `errors` - Error taxonomies

mod aggregate;
mod balance;
mod errors;
mod money;
mod package;
mod payment_event;
mod status;
mod webhook_errors;
mod webhook_verifier;

pub use aggregate::Entitlement;
pub use balance::CreditBalance;
pub use errors::EntitlementError;
pub use money::Currency;
pub use package::{CreditGrant, Package, MAX_VALIDITY_DAYS};
pub use payment_event::{
    PaymentEvent, PaymentEventData, PaymentEventType, SucceededPayment, METADATA_PACKAGE_ID,
    METADATA_USER_ID,
};
pub use status::EntitlementStatus;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{PaymentWebhookVerifier, SignatureHeader, DEFAULT_TOLERANCE_SECS};

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub use webhook_verifier::sign_payload;
