//! Strongly-typed identifiers.
//!
//! `EntitlementId` is generated by this service. The remaining identifiers are
//! owned by external systems (account service, catalog, payment gateway) and are
//! carried as opaque, non-empty strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Unique identifier for an entitlement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitlementId(Uuid);

impl EntitlementId {
    /// Creates a new random EntitlementId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an EntitlementId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntitlementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntitlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntitlementId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("entitlement_id", e.to_string()))
    }
}

/// Declares a validated, non-empty string identifier.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, rejecting empty or blank input.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identity of an account, as issued by the account service.
    UserId,
    "user_id"
);

string_id!(
    /// Catalog identifier of a credit package.
    PackageId,
    "package_id"
);

string_id!(
    /// Gateway reference of a payment intent (`pi_...`).
    ///
    /// Unique per real-world charge; used as the idempotency key for fulfillment.
    PaymentIntentRef,
    "payment_intent_ref"
);
