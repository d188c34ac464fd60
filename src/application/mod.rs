//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::entitlement::{
    ExpireEntitlementsCommand, ExpireEntitlementsHandler, GetActiveBalanceHandler,
    GetActiveBalanceQuery, GetPaymentStatusHandler, GetPaymentStatusQuery,
    HandlePaymentNotificationCommand, HandlePaymentNotificationHandler,
    HandlePaymentNotificationResult, IssueEntitlementCommand, IssueEntitlementHandler,
    IssueEntitlementResult, OperationTimeouts,
};
