//! GetPaymentStatusHandler - Query handler for the entitlement behind a payment.

use std::sync::Arc;

use tokio::time::timeout;

use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::{PaymentIntentRef, UserId};
use crate::ports::{EntitlementReader, EntitlementView};

use super::OperationTimeouts;

/// Query for the entitlement created for a payment intent.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    /// The caller; only their own payments are visible.
    pub user_id: UserId,
    pub payment_intent_ref: PaymentIntentRef,
}

pub type GetPaymentStatusResult = EntitlementView;

/// Lets a client poll whether its payment has been fulfilled.
///
/// Another user's payment is reported as not found, same as an unknown one.
pub struct GetPaymentStatusHandler {
    reader: Arc<dyn EntitlementReader>,
    timeouts: OperationTimeouts,
}

impl GetPaymentStatusHandler {
    pub fn new(reader: Arc<dyn EntitlementReader>, timeouts: OperationTimeouts) -> Self {
        Self { reader, timeouts }
    }

    pub async fn handle(
        &self,
        query: GetPaymentStatusQuery,
    ) -> Result<GetPaymentStatusResult, EntitlementError> {
        let view = timeout(
            self.timeouts.storage,
            self.reader.get_by_payment_intent(&query.payment_intent_ref),
        )
        .await
        .map_err(|_| EntitlementError::timed_out("entitlement store"))?
        .map_err(|e| EntitlementError::infrastructure(e.to_string()))?;

        view.filter(|v| v.user_id == query.user_id)
            .ok_or_else(|| EntitlementError::not_found(query.payment_intent_ref))
    }
}
