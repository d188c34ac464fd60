//! PostgreSQL implementation of PackageCatalog.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::entitlement_row::credits_from_db;
use crate::domain::entitlement::{Currency, Package};
use crate::domain::foundation::{DomainError, ErrorCode, PackageId};
use crate::ports::PackageCatalog;

pub struct PostgresPackageCatalog {
    pool: PgPool,
}

impl PostgresPackageCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: String,
    price: Decimal,
    currency: String,
    base_credits: i32,
    bonus_credits: i32,
    validity_days: i32,
    featured: bool,
    is_active: bool,
}

impl TryFrom<PackageRow> for Package {
    type Error = DomainError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        let invalid = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid package row: {}", e),
            )
        };
        let package = Package {
            id: PackageId::new(row.id).map_err(invalid)?,
            price: row.price,
            currency: Currency::new(&row.currency).map_err(invalid)?,
            base_credits: credits_from_db("base_credits", row.base_credits)?,
            bonus_credits: credits_from_db("bonus_credits", row.bonus_credits)?,
            validity_days: credits_from_db("validity_days", row.validity_days)?,
            featured: row.featured,
            is_active: row.is_active,
        };
        package.validate().map_err(invalid)?;
        Ok(package)
    }
}

#[async_trait]
impl PackageCatalog for PostgresPackageCatalog {
    async fn get_package(&self, id: &PackageId) -> Result<Option<Package>, DomainError> {
        let row: Option<PackageRow> = sqlx::query_as(
            r#"
            SELECT id, price, currency, base_credits, bonus_credits, validity_days,
                   featured, is_active
            FROM packages
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch package: {}", e)))?;

        row.map(Package::try_from).transpose()
    }
}
