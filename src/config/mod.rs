//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `LISTING_CREDITS` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use listing_credits::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod fulfillment;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use fulfillment::FulfillmentConfig;
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LISTING_CREDITS";

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment gateway configuration (Stripe)
    pub payment: PaymentConfig,

    /// Time budgets and the expiry sweep
    #[serde(default)]
    pub fulfillment: FulfillmentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `LISTING_CREDITS__*` variables.
    ///
    /// - `LISTING_CREDITS__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `LISTING_CREDITS__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate(self.is_production())?;
        self.fulfillment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "LISTING_CREDITS__DATABASE__URL",
        "LISTING_CREDITS__PAYMENT__STRIPE_API_KEY",
        "LISTING_CREDITS__PAYMENT__STRIPE_WEBHOOK_SECRET",
        "LISTING_CREDITS__SERVER__PORT",
        "LISTING_CREDITS__SERVER__ENVIRONMENT",
        "LISTING_CREDITS__FULFILLMENT__EXPIRY_SWEEP_INTERVAL_SECS",
    ];

    fn set_minimal_env() {
        env::set_var("LISTING_CREDITS__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("LISTING_CREDITS__PAYMENT__STRIPE_API_KEY", "sk_test_xxx");
        env::set_var("LISTING_CREDITS__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.stripe_api_key.expose_secret(), "sk_test_xxx");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.fulfillment.gateway_timeout_secs, 10);
        assert!(!config.payment.require_livemode);
    }

    #[test]
    fn test_missing_payment_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("LISTING_CREDITS__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("LISTING_CREDITS__SERVER__PORT", "3000"),
            ("LISTING_CREDITS__SERVER__ENVIRONMENT", "production"),
            ("LISTING_CREDITS__FULFILLMENT__EXPIRY_SWEEP_INTERVAL_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.fulfillment.sweep_interval(), None);
    }
}
