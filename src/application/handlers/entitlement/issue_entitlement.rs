//! IssueEntitlementHandler - Command handler for starting a credit package checkout.

use std::sync::Arc;

use tokio::time::timeout;

use crate::domain::entitlement::{Currency, Entitlement, EntitlementError, EntitlementStatus};
use crate::domain::foundation::{EntitlementId, PackageId, PaymentIntentRef, Timestamp, UserId};
use crate::ports::{
    CreatePaymentIntentRequest, EntitlementRepository, IdentityDirectory, PackageCatalog,
    PaymentGateway, PaymentMetadata, SaveResult,
};

use super::OperationTimeouts;

/// Command to buy a package on behalf of an authenticated user.
#[derive(Debug, Clone)]
pub struct IssueEntitlementCommand {
    pub user_id: UserId,
    pub package_id: PackageId,
}

/// Result of a started checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueEntitlementResult {
    pub entitlement_id: EntitlementId,
    pub payment_intent_ref: PaymentIntentRef,
    /// Token the client uses to confirm the payment with the gateway.
    pub client_payment_token: String,
    pub status: EntitlementStatus,
    pub amount_minor: i64,
    pub currency: Currency,
}

/// Handler for starting a checkout.
///
/// Creates a gateway payment intent and records a pending entitlement for it.
/// Credits are granted later, and only by a verified payment notification.
pub struct IssueEntitlementHandler {
    identity: Arc<dyn IdentityDirectory>,
    catalog: Arc<dyn PackageCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    repository: Arc<dyn EntitlementRepository>,
    timeouts: OperationTimeouts,
}

impl IssueEntitlementHandler {
    pub fn new(
        identity: Arc<dyn IdentityDirectory>,
        catalog: Arc<dyn PackageCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        repository: Arc<dyn EntitlementRepository>,
        timeouts: OperationTimeouts,
    ) -> Self {
        Self {
            identity,
            catalog,
            gateway,
            repository,
            timeouts,
        }
    }

    pub async fn handle(
        &self,
        cmd: IssueEntitlementCommand,
    ) -> Result<IssueEntitlementResult, EntitlementError> {
        // 1. Caller must be a known user
        let known = timeout(self.timeouts.storage, self.identity.is_known(&cmd.user_id))
            .await
            .map_err(|_| EntitlementError::timed_out("identity directory"))??;
        if !known {
            return Err(EntitlementError::unknown_user(cmd.user_id));
        }

        // 2. Package must exist and be on sale
        let package = timeout(self.timeouts.storage, self.catalog.get_package(&cmd.package_id))
            .await
            .map_err(|_| EntitlementError::timed_out("package catalog"))??
            .filter(|p| p.is_active)
            .ok_or_else(|| EntitlementError::package_not_found(cmd.package_id.clone()))?;

        // 3. Price in minor units
        let amount_minor = package.amount_minor()?;

        // 4. Create the payment intent
        let intent = timeout(
            self.timeouts.gateway,
            self.gateway.create_payment_intent(CreatePaymentIntentRequest {
                amount_minor,
                currency: package.currency.clone(),
                metadata: PaymentMetadata {
                    user_id: cmd.user_id.clone(),
                    package_id: package.id.clone(),
                },
            }),
        )
        .await
        .map_err(|_| {
            tracing::warn!(package_id = %package.id, "Payment gateway timed out creating intent");
            EntitlementError::timed_out("payment gateway")
        })?
        .map_err(|e| {
            tracing::warn!(error = %e, package_id = %package.id, "Payment gateway rejected intent");
            EntitlementError::gateway(e.message, e.retryable)
        })?;

        // 5. Record the pending entitlement
        let entitlement = Entitlement::issue_pending(
            cmd.user_id,
            &package,
            intent.intent_ref.clone(),
            amount_minor,
            Timestamp::now(),
        );
        let (entitlement_id, status) = self.record_pending(&entitlement).await?;

        tracing::info!(
            entitlement_id = %entitlement_id,
            payment_intent = %intent.intent_ref,
            package_id = %package.id,
            amount_minor,
            "Pending entitlement issued"
        );

        Ok(IssueEntitlementResult {
            entitlement_id,
            payment_intent_ref: intent.intent_ref,
            client_payment_token: intent.client_token,
            status,
            amount_minor,
            currency: package.currency,
        })
    }

    /// Inserts the pending row. Any failure here leaves a live intent with no
    /// local record and is reported as a partial failure.
    async fn record_pending(
        &self,
        entitlement: &Entitlement,
    ) -> Result<(EntitlementId, EntitlementStatus), EntitlementError> {
        let intent = &entitlement.payment_intent_ref;
        let partial = |reason: String| {
            tracing::error!(
                payment_intent = %intent,
                user_id = %entitlement.user_id,
                reason = %reason,
                "Payment intent created but pending entitlement not recorded"
            );
            EntitlementError::partial_failure(intent.clone(), reason)
        };

        let saved = match timeout(self.timeouts.storage, self.repository.insert(entitlement)).await
        {
            Err(_) => return Err(partial("storage timed out".to_string())),
            Ok(Err(e)) => return Err(partial(e.to_string())),
            Ok(Ok(saved)) => saved,
        };

        match saved {
            SaveResult::Inserted => Ok((entitlement.id, entitlement.status)),
            // The notification for this intent won the race and created the row.
            SaveResult::AlreadyExists => {
                match timeout(
                    self.timeouts.storage,
                    self.repository.find_by_payment_intent(intent),
                )
                .await
                {
                    Ok(Ok(Some(existing))) => Ok((existing.id, existing.status)),
                    Ok(Ok(None)) => Err(partial("row reported as existing but not found".into())),
                    Ok(Err(e)) => Err(partial(e.to_string())),
                    Err(_) => Err(partial("storage timed out".to_string())),
                }
            }
        }
    }
}
