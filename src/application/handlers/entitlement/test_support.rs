//! Shared fixtures for entitlement handler tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::adapters::memory::{
    InMemoryEntitlementStore, InMemoryIdentityDirectory, InMemoryPackageCatalog,
};
use crate::domain::entitlement::{Currency, Entitlement, Package};
use crate::domain::foundation::{DomainError, PackageId, PaymentIntentRef, Timestamp, UserId};
use crate::ports::{ActivationResult, EntitlementRepository, SaveResult};

use super::OperationTimeouts;

pub const USER: &str = "user-1";
pub const PACKAGE: &str = "starter";

pub fn user() -> UserId {
    UserId::new(USER).unwrap()
}

pub fn intent(id: &str) -> PaymentIntentRef {
    PaymentIntentRef::new(id).unwrap()
}

/// 5 base + 2 bonus credits, 7 days, 49.00 USD.
pub fn starter_package() -> Package {
    Package {
        id: PackageId::new(PACKAGE).unwrap(),
        price: dec!(49.00),
        currency: Currency::new("usd").unwrap(),
        base_credits: 5,
        bonus_credits: 2,
        validity_days: 7,
        featured: true,
        is_active: true,
    }
}

pub fn catalog() -> Arc<InMemoryPackageCatalog> {
    Arc::new(InMemoryPackageCatalog::with_packages([starter_package()]).unwrap())
}

pub fn directory() -> Arc<InMemoryIdentityDirectory> {
    Arc::new(InMemoryIdentityDirectory::with_users([user()]))
}

pub fn store() -> Arc<InMemoryEntitlementStore> {
    Arc::new(InMemoryEntitlementStore::new())
}

pub fn fast_timeouts() -> OperationTimeouts {
    OperationTimeouts::new(Duration::from_millis(100), Duration::from_millis(100))
}

/// Raw body of a `payment_intent.succeeded` notification.
pub fn succeeded_body(intent_ref: &str, user_id: &str, package_id: &str, amount: i64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", intent_ref),
        "type": "payment_intent.succeeded",
        "created": Timestamp::now().as_unix_secs(),
        "livemode": false,
        "data": {
            "object": {
                "id": intent_ref,
                "object": "payment_intent",
                "amount": amount,
                "amount_received": amount,
                "currency": "usd",
                "status": "succeeded",
                "metadata": { "user_id": user_id, "package_id": package_id }
            }
        }
    }))
    .unwrap()
}

pub fn event_body(event_type: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_other",
        "type": event_type,
        "created": Timestamp::now().as_unix_secs(),
        "data": { "object": { "id": "pi_other", "metadata": {} } }
    }))
    .unwrap()
}

// ════════════════════════════════════════════════════════════════════════════════
// Misbehaving repository
// ════════════════════════════════════════════════════════════════════════════════

/// Repository whose writes fail or stall.
pub struct BrokenRepository {
    pub delay: Option<Duration>,
}

impl BrokenRepository {
    pub fn failing() -> Self {
        Self { delay: None }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }

    async fn misbehave<T>(&self) -> Result<T, DomainError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(DomainError::database("connection refused"))
    }
}

#[async_trait]
impl EntitlementRepository for BrokenRepository {
    async fn insert(&self, _entitlement: &Entitlement) -> Result<SaveResult, DomainError> {
        self.misbehave().await
    }

    async fn activate_pending(
        &self,
        _entitlement: &Entitlement,
    ) -> Result<ActivationResult, DomainError> {
        self.misbehave().await
    }

    async fn find_by_payment_intent(
        &self,
        _payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<Entitlement>, DomainError> {
        self.misbehave().await
    }

    async fn expire_due(&self, _now: Timestamp) -> Result<u64, DomainError> {
        self.misbehave().await
    }
}
