//! HandlePaymentNotificationHandler - Command handler for gateway payment webhooks.
//!
//! The only path that grants credits. Every delivery of the same success
//! notification converges on one active entitlement:
//!
//! - Authenticity is checked by the gateway before anything is read from the body.
//! - Correlation comes solely from the intent metadata (`user_id`, `package_id`).
//! - Duplicate and concurrent deliveries are absorbed by the repository's
//!   unique insert and conditional activation, not by in-process locking.

use std::sync::Arc;

use tokio::time::timeout;

use crate::domain::entitlement::{Entitlement, Package, SucceededPayment, WebhookError};
use crate::domain::foundation::{EntitlementId, PackageId, PaymentIntentRef, Timestamp};
use crate::ports::{
    ActivationResult, EntitlementRepository, PackageCatalog, PaymentGateway, SaveResult,
};

use super::OperationTimeouts;

/// Command to handle a payment notification.
#[derive(Debug, Clone)]
pub struct HandlePaymentNotificationCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header, if the request carried one.
    pub signature: Option<String>,
}

/// Result of notification processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlePaymentNotificationResult {
    /// A pending entitlement was activated by this delivery.
    Activated {
        entitlement_id: EntitlementId,
        payment_intent_ref: PaymentIntentRef,
    },
    /// No pending row existed; an active entitlement was created directly.
    CreatedFromEvent {
        entitlement_id: EntitlementId,
        payment_intent_ref: PaymentIntentRef,
    },
    /// The payment was already fulfilled; nothing changed.
    AlreadyProcessed { payment_intent_ref: PaymentIntentRef },
    /// Authentic event of a type that grants nothing.
    Ignored { event_type: String },
}

impl HandlePaymentNotificationResult {
    /// Short label for logs and acknowledgement bodies.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Activated { .. } => "activated",
            Self::CreatedFromEvent { .. } => "created",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// Handler for gateway payment notifications.
pub struct HandlePaymentNotificationHandler {
    gateway: Arc<dyn PaymentGateway>,
    catalog: Arc<dyn PackageCatalog>,
    repository: Arc<dyn EntitlementRepository>,
    timeouts: OperationTimeouts,
}

impl HandlePaymentNotificationHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        catalog: Arc<dyn PackageCatalog>,
        repository: Arc<dyn EntitlementRepository>,
        timeouts: OperationTimeouts,
    ) -> Self {
        Self {
            gateway,
            catalog,
            repository,
            timeouts,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentNotificationCommand,
    ) -> Result<HandlePaymentNotificationResult, WebhookError> {
        // 1. Authenticate
        let signature = cmd
            .signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let event = self
            .gateway
            .verify_notification(&cmd.payload, &signature)
            .map_err(|e| {
                if e.is_security_event() {
                    tracing::warn!(error = %e, "Rejected payment notification");
                }
                e
            })?;

        // 2. Correlate
        let payment = match event.succeeded_payment() {
            Ok(payment) => payment,
            Err(WebhookError::Ignored(event_type)) => {
                tracing::debug!(event_id = %event.id, event_type = %event_type, "Ignoring payment event");
                return Ok(HandlePaymentNotificationResult::Ignored { event_type });
            }
            Err(e) => {
                tracing::error!(event_id = %event.id, error = %e, "Cannot correlate successful payment");
                return Err(e);
            }
        };

        // 3. Fulfill
        let result = self.fulfill(&payment).await?;
        tracing::info!(
            event_id = %payment.event_id,
            payment_intent = %payment.payment_intent_ref,
            user_id = %payment.user_id,
            outcome = result.outcome(),
            "Payment notification processed"
        );
        Ok(result)
    }

    async fn fulfill(
        &self,
        payment: &SucceededPayment,
    ) -> Result<HandlePaymentNotificationResult, WebhookError> {
        match self.find(&payment.payment_intent_ref).await? {
            Some(existing) if existing.status.is_fulfilled() => {
                Ok(HandlePaymentNotificationResult::AlreadyProcessed {
                    payment_intent_ref: existing.payment_intent_ref,
                })
            }
            Some(pending) => self.activate_pending(pending).await,
            None => self.create_from_event(payment).await,
        }
    }

    /// Activates a pending row with the catalog's current grant.
    async fn activate_pending(
        &self,
        mut entitlement: Entitlement,
    ) -> Result<HandlePaymentNotificationResult, WebhookError> {
        let package = self.package(&entitlement.package_id).await?;
        entitlement.activate(&package.grant(), Timestamp::now())?;

        let activated = timeout(
            self.timeouts.storage,
            self.repository.activate_pending(&entitlement),
        )
        .await
        .map_err(|_| WebhookError::Timeout("entitlement store"))??;

        Ok(match activated {
            ActivationResult::Activated => HandlePaymentNotificationResult::Activated {
                entitlement_id: entitlement.id,
                payment_intent_ref: entitlement.payment_intent_ref,
            },
            // A concurrent delivery got there first.
            ActivationResult::NotPending => HandlePaymentNotificationResult::AlreadyProcessed {
                payment_intent_ref: entitlement.payment_intent_ref,
            },
        })
    }

    /// Builds the active row straight from the event when checkout left no
    /// pending row behind.
    async fn create_from_event(
        &self,
        payment: &SucceededPayment,
    ) -> Result<HandlePaymentNotificationResult, WebhookError> {
        let package = self.package(&payment.package_id).await?;

        let amount_minor = match payment.amount_minor {
            Some(amount) => amount,
            None => package
                .amount_minor()
                .map_err(|e| WebhookError::Catalog(e.to_string()))?,
        };
        let currency = payment
            .currency
            .clone()
            .unwrap_or_else(|| package.currency.clone());

        let entitlement = Entitlement::fulfilled_from_payment(
            payment.user_id.clone(),
            &package,
            payment.payment_intent_ref.clone(),
            amount_minor,
            currency,
            Timestamp::now(),
        );

        let saved = timeout(self.timeouts.storage, self.repository.insert(&entitlement))
            .await
            .map_err(|_| WebhookError::Timeout("entitlement store"))??;

        match saved {
            SaveResult::Inserted => Ok(HandlePaymentNotificationResult::CreatedFromEvent {
                entitlement_id: entitlement.id,
                payment_intent_ref: entitlement.payment_intent_ref,
            }),
            // Lost the race to issuance or to a parallel delivery.
            SaveResult::AlreadyExists => match self.find(&payment.payment_intent_ref).await? {
                Some(existing) if !existing.status.is_fulfilled() => {
                    self.activate_pending(existing).await
                }
                Some(existing) => Ok(HandlePaymentNotificationResult::AlreadyProcessed {
                    payment_intent_ref: existing.payment_intent_ref,
                }),
                None => Err(WebhookError::Database(format!(
                    "Entitlement for {} reported as existing but not found",
                    payment.payment_intent_ref
                ))),
            },
        }
    }

    async fn find(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<Entitlement>, WebhookError> {
        Ok(timeout(
            self.timeouts.storage,
            self.repository.find_by_payment_intent(payment_intent_ref),
        )
        .await
        .map_err(|_| WebhookError::Timeout("entitlement store"))??)
    }

    /// Catalog lookup for fulfillment. `is_active` is not checked: a package
    /// withdrawn after payment is still honored.
    async fn package(&self, id: &PackageId) -> Result<Package, WebhookError> {
        let found = timeout(self.timeouts.storage, self.catalog.get_package(id))
            .await
            .map_err(|_| WebhookError::Timeout("package catalog"))?
            .map_err(|e| WebhookError::Catalog(e.to_string()))?;

        found.ok_or_else(|| {
            tracing::error!(
                package_id = %id,
                "Paid package is missing from the catalog; payment needs manual reconciliation"
            );
            WebhookError::UnknownPackage(id.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::adapters::memory::{InMemoryEntitlementStore, InMemoryPackageCatalog};
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::entitlement::{sign_payload, EntitlementStatus};
    use crate::ports::EntitlementReader;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    const SECRET: &str = "whsec_test";

    struct Fixture {
        handler: Arc<HandlePaymentNotificationHandler>,
        store: Arc<InMemoryEntitlementStore>,
        catalog: Arc<InMemoryPackageCatalog>,
    }

    fn fixture() -> Fixture {
        let store = store();
        let catalog = catalog();
        let handler = HandlePaymentNotificationHandler::new(
            Arc::new(MockPaymentGateway::with_webhook_secret(SECRET)),
            catalog.clone(),
            store.clone(),
            fast_timeouts(),
        );
        Fixture {
            handler: Arc::new(handler),
            store,
            catalog,
        }
    }

    fn signed(body: Vec<u8>) -> HandlePaymentNotificationCommand {
        let signature = sign_payload(SECRET, Timestamp::now().as_unix_secs(), &body);
        HandlePaymentNotificationCommand {
            payload: body,
            signature: Some(signature),
        }
    }

    async fn seed_pending(store: &InMemoryEntitlementStore, intent_ref: &str) -> Entitlement {
        let pending = Entitlement::issue_pending(
            user(),
            &starter_package(),
            intent(intent_ref),
            4900,
            Timestamp::now(),
        );
        store.insert(&pending).await.unwrap();
        pending
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Activation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn activates_pending_entitlement() {
        let f = fixture();
        let pending = seed_pending(&f.store, "pi_1").await;

        let result = f
            .handler
            .handle(signed(succeeded_body("pi_1", USER, PACKAGE, 4900)))
            .await
            .unwrap();

        assert_eq!(
            result,
            HandlePaymentNotificationResult::Activated {
                entitlement_id: pending.id,
                payment_intent_ref: intent("pi_1"),
            }
        );

        let stored = f.store.find_by_payment_intent(&intent("pi_1")).await.unwrap().unwrap();
        assert_eq!(stored.status, EntitlementStatus::Active);
        assert_eq!((stored.base_credits, stored.bonus_credits), (5, 2));
        assert!(stored.featured);
        let activated = stored.activated_at.unwrap();
        assert_eq!(
            stored.expires_at.unwrap().duration_since(&activated),
            ChronoDuration::days(7)
        );
    }

    #[tokio::test]
    async fn creates_active_row_when_no_pending_exists() {
        let f = fixture();

        let result = f
            .handler
            .handle(signed(succeeded_body("pi_2", USER, PACKAGE, 4900)))
            .await
            .unwrap();

        assert!(matches!(
            result,
            HandlePaymentNotificationResult::CreatedFromEvent { .. }
        ));
        let stored = f.store.find_by_payment_intent(&intent("pi_2")).await.unwrap().unwrap();
        assert_eq!(stored.status, EntitlementStatus::Active);
        assert_eq!(stored.amount_minor, 4900);
        assert_eq!(stored.currency.as_str(), "usd");
    }

    #[tokio::test]
    async fn event_amount_is_the_snapshot() {
        let f = fixture();
        f.handler
            .handle(signed(succeeded_body("pi_3", USER, PACKAGE, 4500)))
            .await
            .unwrap();
        let stored = f.store.find_by_payment_intent(&intent("pi_3")).await.unwrap().unwrap();
        assert_eq!(stored.amount_minor, 4500);
    }

    #[tokio::test]
    async fn withdrawn_package_is_still_honored() {
        let f = fixture();
        let mut retired = starter_package();
        retired.is_active = false;
        f.catalog.upsert(retired).await.unwrap();
        seed_pending(&f.store, "pi_4").await;

        let result = f
            .handler
            .handle(signed(succeeded_body("pi_4", USER, PACKAGE, 4900)))
            .await
            .unwrap();
        assert!(matches!(result, HandlePaymentNotificationResult::Activated { .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn redelivery_is_already_processed() {
        let f = fixture();
        seed_pending(&f.store, "pi_5").await;
        let body = succeeded_body("pi_5", USER, PACKAGE, 4900);

        f.handler.handle(signed(body.clone())).await.unwrap();
        let first = f.store.find_by_payment_intent(&intent("pi_5")).await.unwrap().unwrap();

        let again = f.handler.handle(signed(body)).await.unwrap();
        assert_eq!(
            again,
            HandlePaymentNotificationResult::AlreadyProcessed {
                payment_intent_ref: intent("pi_5")
            }
        );
        let second = f.store.find_by_payment_intent(&intent("pi_5")).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn concurrent_deliveries_activate_once() {
        let f = fixture();
        seed_pending(&f.store, "pi_6").await;
        let body = succeeded_body("pi_6", USER, PACKAGE, 4900);

        let deliveries = (0..8).map(|_| {
            let handler = f.handler.clone();
            let cmd = signed(body.clone());
            async move { handler.handle(cmd).await }
        });
        let results = futures::future::join_all(deliveries).await;

        let activated = results
            .iter()
            .filter(|r| matches!(r, Ok(HandlePaymentNotificationResult::Activated { .. })))
            .count();
        assert_eq!(activated, 1);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(f.store.count().await, 1);

        let balance = f.store.active_balance(&user(), Timestamp::now()).await.unwrap();
        assert_eq!(balance.total(), 7);
    }

    #[tokio::test]
    async fn concurrent_deliveries_without_pending_create_once() {
        let f = fixture();
        let body = succeeded_body("pi_7", USER, PACKAGE, 4900);

        let deliveries = (0..8).map(|_| {
            let handler = f.handler.clone();
            let cmd = signed(body.clone());
            async move { handler.handle(cmd).await }
        });
        let results = futures::future::join_all(deliveries).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(f.store.count().await, 1);
        let balance = f.store.active_balance(&user(), Timestamp::now()).await.unwrap();
        assert_eq!(balance.base_remaining, 5);
        assert_eq!(balance.bonus_remaining, 2);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Authenticity
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let f = fixture();
        seed_pending(&f.store, "pi_8").await;

        let err = f
            .handler
            .handle(HandlePaymentNotificationCommand {
                payload: succeeded_body("pi_8", USER, PACKAGE, 4900),
                signature: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MissingSignature));
        let stored = f.store.find_by_payment_intent(&intent("pi_8")).await.unwrap().unwrap();
        assert_eq!(stored.status, EntitlementStatus::Pending);
    }

    #[tokio::test]
    async fn forged_signature_changes_nothing() {
        let f = fixture();
        seed_pending(&f.store, "pi_9").await;
        let body = succeeded_body("pi_9", USER, PACKAGE, 4900);
        let forged = sign_payload("whsec_attacker", Timestamp::now().as_unix_secs(), &body);

        let err = f
            .handler
            .handle(HandlePaymentNotificationCommand {
                payload: body,
                signature: Some(forged),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        let stored = f.store.find_by_payment_intent(&intent("pi_9")).await.unwrap().unwrap();
        assert_eq!(stored.status, EntitlementStatus::Pending);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Non-success and malformed events
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_payment_is_ignored() {
        let f = fixture();
        let result = f
            .handler
            .handle(signed(event_body("payment_intent.payment_failed")))
            .await
            .unwrap();
        assert_eq!(
            result,
            HandlePaymentNotificationResult::Ignored {
                event_type: "payment_intent.payment_failed".to_string()
            }
        );
        assert_eq!(f.store.count().await, 0);
    }

    #[tokio::test]
    async fn missing_metadata_is_rejected() {
        let f = fixture();
        let body = serde_json::to_vec(&serde_json::json!({
            "id": "evt_x",
            "type": "payment_intent.succeeded",
            "created": Timestamp::now().as_unix_secs(),
            "data": { "object": { "id": "pi_10", "amount": 4900, "metadata": { "user_id": USER } } }
        }))
        .unwrap();

        let err = f.handler.handle(signed(body)).await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingMetadata("package_id")));
        assert_eq!(f.store.count().await, 0);
    }

    #[tokio::test]
    async fn package_missing_from_catalog_is_unknown() {
        let f = fixture();
        let err = f
            .handler
            .handle(signed(succeeded_body("pi_11", USER, "ghost", 4900)))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::UnknownPackage(ref id) if id == "ghost"));
        assert!(!err.is_retryable());
        assert_eq!(f.store.count().await, 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Infrastructure failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn storage_failure_is_retryable() {
        let handler = HandlePaymentNotificationHandler::new(
            Arc::new(MockPaymentGateway::new()),
            catalog(),
            Arc::new(BrokenRepository::failing()),
            fast_timeouts(),
        );
        let err = handler
            .handle(HandlePaymentNotificationCommand {
                payload: succeeded_body("pi_12", USER, PACKAGE, 4900),
                signature: Some("unchecked".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Database(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn stalled_storage_times_out() {
        let handler = HandlePaymentNotificationHandler::new(
            Arc::new(MockPaymentGateway::new()),
            catalog(),
            Arc::new(BrokenRepository::stalling(Duration::from_millis(500))),
            fast_timeouts(),
        );
        let err = handler
            .handle(HandlePaymentNotificationCommand {
                payload: succeeded_body("pi_13", USER, PACKAGE, 4900),
                signature: Some("unchecked".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
