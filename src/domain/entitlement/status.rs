//! Entitlement lifecycle state machine.
//!
//! `pending -> active -> expired`, nothing else. A pending row that never sees
//! a successful payment simply stays pending.

use std::fmt;

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    /// Reserved at checkout. Credits are a quote only.
    Pending,

    /// Payment confirmed. Credits are spendable until `expires_at`.
    Active,

    /// Validity window elapsed. Terminal.
    Expired,
}

impl EntitlementStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Pending => "pending",
            EntitlementStatus::Active => "active",
            EntitlementStatus::Expired => "expired",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(EntitlementStatus::Pending),
            "active" => Ok(EntitlementStatus::Active),
            "expired" => Ok(EntitlementStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown entitlement status '{}'", other),
            )),
        }
    }

    /// True once a successful payment has been recorded.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, EntitlementStatus::Active | EntitlementStatus::Expired)
    }
}

impl StateMachine for EntitlementStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EntitlementStatus::*;
        matches!((self, target), (Pending, Active) | (Active, Expired))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EntitlementStatus::*;
        match self {
            Pending => vec![Active],
            Active => vec![Expired],
            Expired => vec![],
        }
    }
}

impl fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntitlementStatus::*;

    const ALL: [EntitlementStatus; 3] = [Pending, Active, Expired];

    #[test]
    fn pending_only_activates() {
        assert!(Pending.can_transition_to(&Active));
        assert!(!Pending.can_transition_to(&Expired));
        assert!(!Pending.can_transition_to(&Pending));
    }

    #[test]
    fn active_only_expires() {
        assert!(Active.can_transition_to(&Expired));
        assert!(!Active.can_transition_to(&Pending));
        assert!(!Active.can_transition_to(&Active));
    }

    #[test]
    fn expired_is_terminal() {
        assert!(Expired.is_terminal());
        for target in ALL {
            assert!(!Expired.can_transition_to(&target));
        }
    }

    #[test]
    fn transition_table_matches_valid_transitions() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn storage_representation_round_trips() {
        for status in ALL {
            assert_eq!(EntitlementStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(EntitlementStatus::parse("cancelled").is_err());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Active).unwrap(), "\"active\"");
    }

    #[test]
    fn fulfilled_excludes_pending() {
        assert!(!Pending.is_fulfilled());
        assert!(Active.is_fulfilled());
        assert!(Expired.is_fulfilled());
    }
}
