//! Entitlement aggregate.
//!
//! One entitlement exists per gateway payment intent. It is born `pending` at
//! checkout (or directly `active` when the payment notification arrives first),
//! is activated exactly once, and later expires.
//!
//! # Invariants
//!
//! - `pending` rows have neither `activated_at` nor `expires_at`.
//! - `active` and `expired` rows have both, and
//!   `expires_at = activated_at + validity_days`.
//! - The amount and currency are a snapshot of the charge and never change.

use serde::{Deserialize, Serialize};

use super::money::Currency;
use super::package::{CreditGrant, Package};
use super::status::EntitlementStatus;
use crate::domain::foundation::{
    DomainError, EntitlementId, ErrorCode, PackageId, PaymentIntentRef, StateMachine, Timestamp,
    UserId,
};

/// A user's right to publish a bounded number of listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub user_id: UserId,
    pub package_id: PackageId,
    pub payment_intent_ref: PaymentIntentRef,

    /// Amount charged, in minor units of `currency`.
    pub amount_minor: i64,
    pub currency: Currency,

    /// Base credits remaining. A quote only while pending.
    pub base_credits: u32,
    /// Bonus credits remaining. A quote only while pending.
    pub bonus_credits: u32,

    pub status: EntitlementStatus,
    pub featured: bool,

    pub created_at: Timestamp,
    pub activated_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl Entitlement {
    /// Reserves a pending entitlement for a freshly created payment intent.
    ///
    /// The credit figures are a provisional quote; expiry is not computed here.
    pub fn issue_pending(
        user_id: UserId,
        package: &Package,
        payment_intent_ref: PaymentIntentRef,
        amount_minor: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id: EntitlementId::new(),
            user_id,
            package_id: package.id.clone(),
            payment_intent_ref,
            amount_minor,
            currency: package.currency.clone(),
            base_credits: package.base_credits,
            bonus_credits: package.bonus_credits,
            status: EntitlementStatus::Pending,
            featured: package.featured,
            created_at: now,
            activated_at: None,
            expires_at: None,
        }
    }

    /// Builds an already-active entitlement straight from a verified payment.
    ///
    /// Used when the notification arrives before (or without) a pending row.
    pub fn fulfilled_from_payment(
        user_id: UserId,
        package: &Package,
        payment_intent_ref: PaymentIntentRef,
        amount_minor: i64,
        currency: Currency,
        now: Timestamp,
    ) -> Self {
        let grant = package.grant();
        let mut entitlement = Self {
            id: EntitlementId::new(),
            user_id,
            package_id: package.id.clone(),
            payment_intent_ref,
            amount_minor,
            currency,
            base_credits: 0,
            bonus_credits: 0,
            status: EntitlementStatus::Pending,
            featured: grant.featured,
            created_at: now,
            activated_at: None,
            expires_at: None,
        };
        entitlement.apply_grant(&grant, now);
        entitlement.status = EntitlementStatus::Active;
        entitlement
    }

    /// Activates a pending entitlement with the catalog's current grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless the entitlement is pending.
    pub fn activate(&mut self, grant: &CreditGrant, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(EntitlementStatus::Active)?;
        self.apply_grant(grant, now);
        Ok(())
    }

    /// Marks an active entitlement as expired once its window has passed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if not active or not yet past `expires_at`.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        match self.expires_at {
            Some(expires_at) if now.is_after(&expires_at) => {
                self.transition_to(EntitlementStatus::Expired)
            }
            _ => Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Entitlement {} is not past its expiry", self.id),
            )),
        }
    }

    /// True if the credits may be drawn down at `now`.
    pub fn is_spendable(&self, now: Timestamp) -> bool {
        self.status == EntitlementStatus::Active
            && self.expires_at.map(|e| e.is_after(&now)).unwrap_or(false)
    }

    /// Checks the timestamp invariants for the current status.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let consistent = match self.status {
            EntitlementStatus::Pending => self.activated_at.is_none() && self.expires_at.is_none(),
            EntitlementStatus::Active | EntitlementStatus::Expired => {
                matches!((self.activated_at, self.expires_at), (Some(a), Some(e)) if e.is_after(&a))
            }
        };
        if consistent {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Entitlement {} has inconsistent timestamps for status {}",
                    self.id, self.status
                ),
            ))
        }
    }

    fn apply_grant(&mut self, grant: &CreditGrant, now: Timestamp) {
        self.base_credits = grant.base_credits;
        self.bonus_credits = grant.bonus_credits;
        self.activated_at = Some(now);
        self.expires_at = Some(now.add_days(grant.validity_days as i64));
    }

    fn transition_to(&mut self, target: EntitlementStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition entitlement from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
