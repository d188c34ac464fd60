//! Entitlement handlers.
//!
//! ## Commands
//! - Issuing a pending entitlement at checkout
//! - Fulfilling verified payment notifications
//! - Expiring lapsed entitlements
//!
//! ## Queries
//! - Active credit balance
//! - Payment status for the paying user

mod expire_entitlements;
mod get_active_balance;
mod get_payment_status;
mod handle_payment_notification;
mod issue_entitlement;
mod timeouts;

#[cfg(test)]
mod test_support;

pub use timeouts::OperationTimeouts;

// Commands
pub use expire_entitlements::{
    ExpireEntitlementsCommand, ExpireEntitlementsHandler, ExpireEntitlementsResult,
};
pub use handle_payment_notification::{
    HandlePaymentNotificationCommand, HandlePaymentNotificationHandler,
    HandlePaymentNotificationResult,
};
pub use issue_entitlement::{
    IssueEntitlementCommand, IssueEntitlementHandler, IssueEntitlementResult,
};

// Queries
pub use get_active_balance::{
    GetActiveBalanceHandler, GetActiveBalanceQuery, GetActiveBalanceResult,
};
pub use get_payment_status::{
    GetPaymentStatusHandler, GetPaymentStatusQuery, GetPaymentStatusResult,
};
