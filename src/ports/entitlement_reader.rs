//! Entitlement reader port (read side).
//!
//! Query-optimized views for the balance and payment-status endpoints.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::entitlement::{CreditBalance, Currency, Entitlement, EntitlementStatus};
use crate::domain::foundation::{
    DomainError, EntitlementId, PackageId, PaymentIntentRef, Timestamp, UserId,
};

/// Reader port for entitlement queries.
#[async_trait]
pub trait EntitlementReader: Send + Sync {
    /// Aggregate of the user's spendable entitlements at `now`.
    ///
    /// Only `active` rows with `expires_at > now` count. Pending and expired
    /// rows contribute nothing.
    async fn active_balance(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<CreditBalance, DomainError>;

    /// Look up the entitlement created for a payment intent.
    async fn get_by_payment_intent(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<EntitlementView>, DomainError>;
}

/// Entitlement as shown to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitlementView {
    pub id: EntitlementId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub payment_intent_ref: PaymentIntentRef,
    pub status: EntitlementStatus,
    pub amount_minor: i64,
    pub currency: Currency,
    pub base_credits: u32,
    pub bonus_credits: u32,
    pub featured: bool,
    pub created_at: Timestamp,
    pub activated_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl From<&Entitlement> for EntitlementView {
    fn from(e: &Entitlement) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id.clone(),
            package_id: e.package_id.clone(),
            payment_intent_ref: e.payment_intent_ref.clone(),
            status: e.status,
            amount_minor: e.amount_minor,
            currency: e.currency.clone(),
            base_credits: e.base_credits,
            bonus_credits: e.bonus_credits,
            featured: e.featured,
            created_at: e.created_at,
            activated_at: e.activated_at,
            expires_at: e.expires_at,
        }
    }
}
