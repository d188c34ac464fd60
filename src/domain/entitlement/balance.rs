//! Spendable credit balance aggregated over a user's entitlements.

use serde::Serialize;

use super::aggregate::Entitlement;
use crate::domain::foundation::Timestamp;

/// Credits a user may spend right now.
///
/// Only `active` entitlements whose expiry lies strictly in the future count.
/// Pending quotes never contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreditBalance {
    pub base_remaining: u64,
    pub bonus_remaining: u64,
    /// True if any contributing entitlement came from a featured package.
    pub featured: bool,
    /// Soonest expiry among contributing entitlements.
    pub earliest_expiry: Option<Timestamp>,
}

impl CreditBalance {
    /// Sums the spendable entitlements in `entitlements` as of `now`.
    pub fn from_entitlements<'a>(
        entitlements: impl IntoIterator<Item = &'a Entitlement>,
        now: Timestamp,
    ) -> Self {
        entitlements
            .into_iter()
            .filter(|e| e.is_spendable(now))
            .fold(Self::default(), |mut acc, e| {
                acc.base_remaining += u64::from(e.base_credits);
                acc.bonus_remaining += u64::from(e.bonus_credits);
                acc.featured |= e.featured;
                acc.earliest_expiry = match (acc.earliest_expiry, e.expires_at) {
                    (Some(current), Some(candidate)) => Some(current.min(candidate)),
                    (current, candidate) => current.or(candidate),
                };
                acc
            })
    }

    pub fn total(&self) -> u64 {
        self.base_remaining + self.bonus_remaining
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
