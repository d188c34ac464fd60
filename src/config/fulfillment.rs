//! Fulfillment timing configuration

use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::handlers::entitlement::OperationTimeouts;

/// Time budgets for external calls and the expiry sweep cadence
#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentConfig {
    /// Upper bound on a payment gateway call
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Upper bound on a storage, catalog or directory call
    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_secs: u64,

    /// Seconds between expiry sweeps; 0 disables the sweep
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,
}

impl FulfillmentConfig {
    pub fn timeouts(&self) -> OperationTimeouts {
        OperationTimeouts::new(
            Duration::from_secs(self.gateway_timeout_secs),
            Duration::from_secs(self.storage_timeout_secs),
        )
    }

    /// `None` when the sweep is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.expiry_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.expiry_sweep_interval_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=120).contains(&self.gateway_timeout_secs) {
            return Err(ValidationError::InvalidOperationTimeout("gateway_timeout_secs"));
        }
        if !(1..=120).contains(&self.storage_timeout_secs) {
            return Err(ValidationError::InvalidOperationTimeout("storage_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            gateway_timeout_secs: default_gateway_timeout(),
            storage_timeout_secs: default_storage_timeout(),
            expiry_sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_storage_timeout() -> u64 {
    5
}

fn default_sweep_interval() -> u64 {
    300
}
