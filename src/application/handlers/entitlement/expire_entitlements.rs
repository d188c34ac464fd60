//! ExpireEntitlementsHandler - Command handler for the expiry sweep.
//!
//! Balance queries already ignore lapsed rows; the sweep only makes the stored
//! status match reality.

use std::sync::Arc;

use tokio::time::timeout;

use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::Timestamp;
use crate::ports::EntitlementRepository;

use super::OperationTimeouts;

/// Command to expire every active entitlement whose window closed before `as_of`.
#[derive(Debug, Clone, Copy)]
pub struct ExpireEntitlementsCommand {
    pub as_of: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpireEntitlementsResult {
    pub expired: u64,
}

pub struct ExpireEntitlementsHandler {
    repository: Arc<dyn EntitlementRepository>,
    timeouts: OperationTimeouts,
}

impl ExpireEntitlementsHandler {
    pub fn new(repository: Arc<dyn EntitlementRepository>, timeouts: OperationTimeouts) -> Self {
        Self {
            repository,
            timeouts,
        }
    }

    pub async fn handle(
        &self,
        cmd: ExpireEntitlementsCommand,
    ) -> Result<ExpireEntitlementsResult, EntitlementError> {
        let expired = timeout(self.timeouts.storage, self.repository.expire_due(cmd.as_of))
            .await
            .map_err(|_| EntitlementError::timed_out("entitlement store"))??;

        if expired > 0 {
            tracing::info!(expired, "Expired lapsed entitlements");
        }
        Ok(ExpireEntitlementsResult { expired })
    }
}
