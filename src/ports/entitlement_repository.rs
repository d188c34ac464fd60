//! Entitlement repository port (write side).
//!
//! Idempotency of fulfillment rests on two storage guarantees:
//!
//! - **Unique payment intent**: at most one row per `payment_intent_ref`.
//!   A losing concurrent insert reports `SaveResult::AlreadyExists` instead
//!   of an error.
//! - **Conditional activation**: a pending row is flipped to active only if it
//!   is still pending at write time. Losing that race reports
//!   `ActivationResult::NotPending`.
//!
//! Together these make at-most-one activation hold across processes, not just
//! within one.

use async_trait::async_trait;

use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::{DomainError, PaymentIntentRef, Timestamp};

/// Outcome of inserting a new entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// Row was inserted.
    Inserted,
    /// A row for the same payment intent already exists; nothing was written.
    AlreadyExists,
}

/// Outcome of a conditional pending-to-active update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationResult {
    /// This call performed the activation.
    Activated,
    /// The row was no longer pending (or missing); nothing was written.
    NotPending,
}

/// Repository port for Entitlement persistence.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Insert a new entitlement.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure other than the uniqueness
    ///   conflict, which is reported as `SaveResult::AlreadyExists`.
    async fn insert(&self, entitlement: &Entitlement) -> Result<SaveResult, DomainError>;

    /// Write the activation fields of `entitlement` if its stored row is still
    /// pending.
    ///
    /// `entitlement` must already be in the active state (see
    /// `Entitlement::activate`).
    async fn activate_pending(
        &self,
        entitlement: &Entitlement,
    ) -> Result<ActivationResult, DomainError>;

    /// Find an entitlement by its payment intent reference.
    async fn find_by_payment_intent(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<Entitlement>, DomainError>;

    /// Mark every active entitlement with `expires_at < now` as expired.
    ///
    /// Returns the number of rows changed.
    async fn expire_due(&self, now: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitlement_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn EntitlementRepository) {}
    }
}
