//! PostgreSQL implementation of EntitlementRepository.
//!
//! The `entitlements_payment_intent_ref_key` unique constraint and the
//! `WHERE status = 'pending'` guard on activation are what make fulfillment
//! idempotent across concurrent deliveries and multiple instances.

use async_trait::async_trait;
use sqlx::PgPool;

use super::entitlement_row::{credits_to_db, EntitlementRow, ENTITLEMENT_COLUMNS};
use crate::domain::entitlement::{Entitlement, EntitlementStatus};
use crate::domain::foundation::{DomainError, PaymentIntentRef, Timestamp};
use crate::ports::{ActivationResult, EntitlementRepository, SaveResult};

/// Name of the one-row-per-payment constraint.
const PAYMENT_INTENT_UNIQUE: &str = "entitlements_payment_intent_ref_key";

/// PostgreSQL implementation of the EntitlementRepository port.
pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn insert(&self, entitlement: &Entitlement) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO entitlements (
                id, user_id, package_id, payment_intent_ref, amount_minor, currency,
                base_credits, bonus_credits, status, featured,
                created_at, activated_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entitlement.id.as_uuid())
        .bind(entitlement.user_id.as_str())
        .bind(entitlement.package_id.as_str())
        .bind(entitlement.payment_intent_ref.as_str())
        .bind(entitlement.amount_minor)
        .bind(entitlement.currency.as_str())
        .bind(credits_to_db("base_credits", entitlement.base_credits)?)
        .bind(credits_to_db("bonus_credits", entitlement.bonus_credits)?)
        .bind(entitlement.status.as_str())
        .bind(entitlement.featured)
        .bind(entitlement.created_at.as_datetime())
        .bind(entitlement.activated_at.map(|t| *t.as_datetime()))
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(SaveResult::Inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some(PAYMENT_INTENT_UNIQUE) => {
                tracing::debug!(
                    payment_intent = %entitlement.payment_intent_ref,
                    "Entitlement for payment intent already exists"
                );
                Ok(SaveResult::AlreadyExists)
            }
            Err(e) => Err(DomainError::database(format!(
                "Failed to insert entitlement: {}",
                e
            ))),
        }
    }

    async fn activate_pending(
        &self,
        entitlement: &Entitlement,
    ) -> Result<ActivationResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE entitlements SET
                status = $2,
                base_credits = $3,
                bonus_credits = $4,
                featured = $5,
                activated_at = $6,
                expires_at = $7
            WHERE payment_intent_ref = $1 AND status = $8
            "#,
        )
        .bind(entitlement.payment_intent_ref.as_str())
        .bind(entitlement.status.as_str())
        .bind(credits_to_db("base_credits", entitlement.base_credits)?)
        .bind(credits_to_db("bonus_credits", entitlement.bonus_credits)?)
        .bind(entitlement.featured)
        .bind(entitlement.activated_at.map(|t| *t.as_datetime()))
        .bind(entitlement.expires_at.map(|t| *t.as_datetime()))
        .bind(EntitlementStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to activate entitlement: {}", e)))?;

        Ok(if result.rows_affected() == 1 {
            ActivationResult::Activated
        } else {
            ActivationResult::NotPending
        })
    }

    async fn find_by_payment_intent(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<Entitlement>, DomainError> {
        let sql = format!(
            "SELECT {} FROM entitlements WHERE payment_intent_ref = $1",
            ENTITLEMENT_COLUMNS
        );
        let row: Option<EntitlementRow> = sqlx::query_as(&sql)
            .bind(payment_intent_ref.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch entitlement: {}", e)))?;

        row.map(Entitlement::try_from).transpose()
    }

    async fn expire_due(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE entitlements SET status = $2
            WHERE status = $3 AND expires_at < $1
            "#,
        )
        .bind(now.as_datetime())
        .bind(EntitlementStatus::Expired.as_str())
        .bind(EntitlementStatus::Active.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to expire entitlements: {}", e)))?;

        Ok(result.rows_affected())
    }
}
