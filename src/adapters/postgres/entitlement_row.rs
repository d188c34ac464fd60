//! Row mapping shared by the entitlement repository and reader.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entitlement::{Currency, Entitlement, EntitlementStatus};
use crate::domain::foundation::{
    DomainError, EntitlementId, ErrorCode, PackageId, PaymentIntentRef, Timestamp, UserId,
};

/// Column list matching `EntitlementRow`.
pub(super) const ENTITLEMENT_COLUMNS: &str = "id, user_id, package_id, payment_intent_ref, \
    amount_minor, currency, base_credits, bonus_credits, status, featured, \
    created_at, activated_at, expires_at";

/// Database row representation of an entitlement.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct EntitlementRow {
    pub id: Uuid,
    pub user_id: String,
    pub package_id: String,
    pub payment_intent_ref: String,
    pub amount_minor: i64,
    pub currency: String,
    pub base_credits: i32,
    pub bonus_credits: i32,
    pub status: String,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let entitlement = Entitlement {
            id: EntitlementId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            package_id: PackageId::new(row.package_id).map_err(corrupt)?,
            payment_intent_ref: PaymentIntentRef::new(row.payment_intent_ref).map_err(corrupt)?,
            amount_minor: row.amount_minor,
            currency: Currency::new(&row.currency).map_err(corrupt)?,
            base_credits: credits_from_db("base_credits", row.base_credits)?,
            bonus_credits: credits_from_db("bonus_credits", row.bonus_credits)?,
            status: parse_status(&row.status)?,
            featured: row.featured,
            created_at: Timestamp::from_datetime(row.created_at),
            activated_at: row.activated_at.map(Timestamp::from_datetime),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
        };
        entitlement.check_invariants().map_err(corrupt)?;
        Ok(entitlement)
    }
}

pub(super) fn parse_status(s: &str) -> Result<EntitlementStatus, DomainError> {
    EntitlementStatus::parse(s).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )
    })
}

pub(super) fn credits_from_db(field: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Negative {} in database: {}", field, value),
        )
    })
}

pub(super) fn credits_to_db(field: &str, value: u32) -> Result<i32, DomainError> {
    i32::try_from(value).map_err(|_| {
        DomainError::validation(field, format!("{} exceeds storable range", value))
    })
}

fn corrupt(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid entitlement row: {}", err),
    )
}
