//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time, the state machine trait, and error types
//! that form the vocabulary of the entitlement domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{EntitlementId, PackageId, PaymentIntentRef, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
