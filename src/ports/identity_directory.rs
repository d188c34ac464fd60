//! Identity directory port.
//!
//! The account service owns users; issuance only asks whether one exists.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// True if `user_id` names a live account.
    async fn is_known(&self, user_id: &UserId) -> Result<bool, DomainError>;
}
