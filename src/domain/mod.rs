//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, time, state machine, errors)
//! - `entitlement` - Listing-credit entitlements and payment fulfillment rules

pub mod entitlement;
pub mod foundation;
