//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe, including:
//! - Payment intent creation with user/package metadata
//! - Webhook signature verification and livemode enforcement
//!
//! # Configuration
//!
//! Configured through `PaymentConfig`:
//! - `LISTING_CREDITS__PAYMENT__STRIPE_API_KEY`: Stripe secret API key
//! - `LISTING_CREDITS__PAYMENT__STRIPE_WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod mock_payment_gateway;
mod payment_gateway;

pub use mock_payment_gateway::MockPaymentGateway;
pub use payment_gateway::{StripeConfig, StripePaymentGateway, DEFAULT_API_BASE_URL};
