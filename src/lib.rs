//! Listing Credits - entitlement issuance and payment fulfillment.
//!
//! Users buy packages of listing credits through a payment gateway. Checkout
//! records a `pending` entitlement; only a verified successful-payment
//! notification turns it `active`, exactly once per payment, however many
//! times the gateway redelivers.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
