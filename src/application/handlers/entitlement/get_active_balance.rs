//! GetActiveBalanceHandler - Query handler for a user's spendable credits.

use std::sync::Arc;

use tokio::time::timeout;

use crate::domain::entitlement::{CreditBalance, EntitlementError};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::EntitlementReader;

use super::OperationTimeouts;

/// Query for a user's spendable balance.
#[derive(Debug, Clone)]
pub struct GetActiveBalanceQuery {
    pub user_id: UserId,
}

pub type GetActiveBalanceResult = CreditBalance;

/// Sums active, unexpired entitlements. Pending quotes count for nothing.
pub struct GetActiveBalanceHandler {
    reader: Arc<dyn EntitlementReader>,
    timeouts: OperationTimeouts,
}

impl GetActiveBalanceHandler {
    pub fn new(reader: Arc<dyn EntitlementReader>, timeouts: OperationTimeouts) -> Self {
        Self { reader, timeouts }
    }

    pub async fn handle(
        &self,
        query: GetActiveBalanceQuery,
    ) -> Result<GetActiveBalanceResult, EntitlementError> {
        timeout(
            self.timeouts.storage,
            self.reader.active_balance(&query.user_id, Timestamp::now()),
        )
        .await
        .map_err(|_| EntitlementError::timed_out("entitlement store"))?
        .map_err(|e| EntitlementError::infrastructure(e.to_string()))
    }
}
