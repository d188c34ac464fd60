//! Adapters - Implementations of ports against concrete infrastructure.
//!
//! - `http` - Axum REST endpoints and the payment webhook
//! - `memory` - In-process stores for tests and local runs
//! - `postgres` - sqlx-backed repository, reader, catalog and directory
//! - `stripe` - Stripe payment gateway and its test double

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
