//! Catalog package as seen by the entitlement engine.
//!
//! Packages are owned by the catalog; this side only reads them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Currency;
use crate::domain::foundation::{PackageId, ValidationError};

/// Longest validity window a package may grant.
pub const MAX_VALIDITY_DAYS: u32 = 3650;

/// A purchasable bundle of listing credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    /// Price in major currency units.
    pub price: Decimal,
    pub currency: Currency,
    pub base_credits: u32,
    pub bonus_credits: u32,
    pub validity_days: u32,
    pub featured: bool,
    pub is_active: bool,
}

/// What a package grants when a payment for it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditGrant {
    pub base_credits: u32,
    pub bonus_credits: u32,
    pub validity_days: u32,
    pub featured: bool,
}

impl Package {
    /// Checks the values the engine depends on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.validity_days == 0 || self.validity_days > MAX_VALIDITY_DAYS {
            return Err(ValidationError::out_of_range(
                "validity_days",
                1,
                MAX_VALIDITY_DAYS as i64,
                self.validity_days as i64,
            ));
        }
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::invalid_format(
                "price",
                format!("must be positive, got {}", self.price),
            ));
        }
        Ok(())
    }

    /// Amount to request from the gateway, in minor units.
    pub fn amount_minor(&self) -> Result<i64, ValidationError> {
        self.currency.to_minor_units(self.price)
    }

    pub fn grant(&self) -> CreditGrant {
        CreditGrant {
            base_credits: self.base_credits,
            bonus_credits: self.bonus_credits,
            validity_days: self.validity_days,
            featured: self.featured,
        }
    }
}
