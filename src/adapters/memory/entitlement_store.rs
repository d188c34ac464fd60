//! In-Memory Entitlement Store
//!
//! Implements both the repository and the reader over one map keyed by
//! payment intent. The write lock gives the same guarantees as the database
//! constraints: one row per intent and a conditional pending-to-active flip.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entitlement::{CreditBalance, Entitlement, EntitlementStatus};
use crate::domain::foundation::{DomainError, PaymentIntentRef, Timestamp, UserId};
use crate::ports::{
    ActivationResult, EntitlementReader, EntitlementRepository, EntitlementView, SaveResult,
};

#[derive(Debug, Clone, Default)]
pub struct InMemoryEntitlementStore {
    rows: Arc<RwLock<HashMap<PaymentIntentRef, Entitlement>>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entitlement (useful for tests)
    pub async fn all(&self) -> Vec<Entitlement> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementStore {
    async fn insert(&self, entitlement: &Entitlement) -> Result<SaveResult, DomainError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entitlement.payment_intent_ref) {
            return Ok(SaveResult::AlreadyExists);
        }
        rows.insert(entitlement.payment_intent_ref.clone(), entitlement.clone());
        Ok(SaveResult::Inserted)
    }

    async fn activate_pending(
        &self,
        entitlement: &Entitlement,
    ) -> Result<ActivationResult, DomainError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&entitlement.payment_intent_ref) {
            Some(stored) if stored.status == EntitlementStatus::Pending => {
                stored.status = entitlement.status;
                stored.base_credits = entitlement.base_credits;
                stored.bonus_credits = entitlement.bonus_credits;
                stored.featured = entitlement.featured;
                stored.activated_at = entitlement.activated_at;
                stored.expires_at = entitlement.expires_at;
                Ok(ActivationResult::Activated)
            }
            _ => Ok(ActivationResult::NotPending),
        }
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<Entitlement>, DomainError> {
        Ok(self.rows.read().await.get(payment_intent_ref).cloned())
    }

    async fn expire_due(&self, now: Timestamp) -> Result<u64, DomainError> {
        let mut rows = self.rows.write().await;
        let mut expired = 0;
        for entitlement in rows.values_mut() {
            if entitlement.status == EntitlementStatus::Active && entitlement.expire(now).is_ok() {
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl EntitlementReader for InMemoryEntitlementStore {
    async fn active_balance(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<CreditBalance, DomainError> {
        let rows = self.rows.read().await;
        Ok(CreditBalance::from_entitlements(
            rows.values().filter(|e| e.user_id == *user_id),
            now,
        ))
    }

    async fn get_by_payment_intent(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<EntitlementView>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .get(payment_intent_ref)
            .map(EntitlementView::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::{Currency, Package};
    use crate::domain::foundation::PackageId;
    use rust_decimal_macros::dec;

    fn package() -> Package {
        Package {
            id: PackageId::new("starter").unwrap(),
            price: dec!(49.00),
            currency: Currency::new("usd").unwrap(),
            base_credits: 5,
            bonus_credits: 2,
            validity_days: 7,
            featured: false,
            is_active: true,
        }
    }

    fn pending(intent: &str, user: &str) -> Entitlement {
        Entitlement::issue_pending(
            UserId::new(user).unwrap(),
            &package(),
            PaymentIntentRef::new(intent).unwrap(),
            4900,
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn second_insert_for_same_intent_reports_existing() {
        let store = InMemoryEntitlementStore::new();
        assert_eq!(store.insert(&pending("pi_1", "u1")).await.unwrap(), SaveResult::Inserted);
        assert_eq!(
            store.insert(&pending("pi_1", "u1")).await.unwrap(),
            SaveResult::AlreadyExists
        );
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn activation_only_applies_to_pending_rows() {
        let store = InMemoryEntitlementStore::new();
        let mut e = pending("pi_1", "u1");
        store.insert(&e).await.unwrap();

        e.activate(&package().grant(), Timestamp::now()).unwrap();
        assert_eq!(
            store.activate_pending(&e).await.unwrap(),
            ActivationResult::Activated
        );
        assert_eq!(
            store.activate_pending(&e).await.unwrap(),
            ActivationResult::NotPending
        );
    }

    #[tokio::test]
    async fn balance_ignores_pending_and_other_users() {
        let store = InMemoryEntitlementStore::new();
        let now = Timestamp::now();

        let mut active = pending("pi_1", "u1");
        active.activate(&package().grant(), now).unwrap();
        store.insert(&active).await.unwrap();
        store.insert(&pending("pi_2", "u1")).await.unwrap();

        let mut other = pending("pi_3", "u2");
        other.activate(&package().grant(), now).unwrap();
        store.insert(&other).await.unwrap();

        let balance = store
            .active_balance(&UserId::new("u1").unwrap(), now)
            .await
            .unwrap();
        assert_eq!(balance.base_remaining, 5);
        assert_eq!(balance.bonus_remaining, 2);
    }

    #[tokio::test]
    async fn expire_due_only_touches_lapsed_active_rows() {
        let store = InMemoryEntitlementStore::new();
        let start = Timestamp::now();

        let mut active = pending("pi_1", "u1");
        active.activate(&package().grant(), start).unwrap();
        store.insert(&active).await.unwrap();
        store.insert(&pending("pi_2", "u1")).await.unwrap();

        assert_eq!(store.expire_due(start.add_days(1)).await.unwrap(), 0);
        assert_eq!(store.expire_due(start.add_days(8)).await.unwrap(), 1);

        let rows = store.all().await;
        assert!(rows
            .iter()
            .any(|e| e.status == EntitlementStatus::Expired));
        assert!(rows
            .iter()
            .any(|e| e.status == EntitlementStatus::Pending));
    }
}
