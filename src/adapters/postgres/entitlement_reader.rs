//! PostgreSQL implementation of EntitlementReader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::entitlement_row::{EntitlementRow, ENTITLEMENT_COLUMNS};
use crate::domain::entitlement::{CreditBalance, Entitlement, EntitlementStatus};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentIntentRef, Timestamp, UserId};
use crate::ports::{EntitlementReader, EntitlementView};

pub struct PostgresEntitlementReader {
    pool: PgPool,
}

impl PostgresEntitlementReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row for the balance aggregate.
#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    base_remaining: i64,
    bonus_remaining: i64,
    featured: bool,
    earliest_expiry: Option<DateTime<Utc>>,
}

impl TryFrom<BalanceRow> for CreditBalance {
    type Error = DomainError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        let non_negative = |field: &str, v: i64| {
            u64::try_from(v).map_err(|_| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Negative {} aggregate: {}", field, v),
                )
            })
        };
        Ok(CreditBalance {
            base_remaining: non_negative("base_remaining", row.base_remaining)?,
            bonus_remaining: non_negative("bonus_remaining", row.bonus_remaining)?,
            featured: row.featured,
            earliest_expiry: row.earliest_expiry.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl EntitlementReader for PostgresEntitlementReader {
    async fn active_balance(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<CreditBalance, DomainError> {
        let row: BalanceRow = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(base_credits), 0)::BIGINT AS base_remaining,
                COALESCE(SUM(bonus_credits), 0)::BIGINT AS bonus_remaining,
                COALESCE(BOOL_OR(featured), FALSE) AS featured,
                MIN(expires_at) AS earliest_expiry
            FROM entitlements
            WHERE user_id = $1 AND status = $3 AND expires_at > $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.as_datetime())
        .bind(EntitlementStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to compute balance: {}", e)))?;

        CreditBalance::try_from(row)
    }

    async fn get_by_payment_intent(
        &self,
        payment_intent_ref: &PaymentIntentRef,
    ) -> Result<Option<EntitlementView>, DomainError> {
        let sql = format!(
            "SELECT {} FROM entitlements WHERE payment_intent_ref = $1",
            ENTITLEMENT_COLUMNS
        );
        let row: Option<EntitlementRow> = sqlx::query_as(&sql)
            .bind(payment_intent_ref.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch entitlement: {}", e)))?;

        row.map(|r| Entitlement::try_from(r).map(|e| EntitlementView::from(&e)))
            .transpose()
    }
}
