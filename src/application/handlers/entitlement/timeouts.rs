//! Time budgets for calls that leave the process.

use std::time::Duration;

/// Upper bounds for gateway and storage calls made by the entitlement handlers.
///
/// Exceeding a bound surfaces as a retryable timeout error; the call is never
/// left to hang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub gateway: Duration,
    pub storage: Duration,
}

impl OperationTimeouts {
    pub fn new(gateway: Duration, storage: Duration) -> Self {
        Self { gateway, storage }
    }
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            gateway: Duration::from_secs(10),
            storage: Duration::from_secs(5),
        }
    }
}
