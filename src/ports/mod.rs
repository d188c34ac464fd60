//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `EntitlementRepository` - Entitlement persistence with idempotent insert/activate
//! - `EntitlementReader` - Balance and payment-status queries
//! - `PackageCatalog` - Read-only package terms
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Payment intent creation and webhook verification
//! - `IdentityDirectory` - Known-user check

mod entitlement_reader;
mod entitlement_repository;
mod identity_directory;
mod package_catalog;
mod payment_gateway;

pub use entitlement_reader::{EntitlementReader, EntitlementView};
pub use entitlement_repository::{ActivationResult, EntitlementRepository, SaveResult};
pub use identity_directory::IdentityDirectory;
pub use package_catalog::PackageCatalog;
pub use payment_gateway::{
    CreatePaymentIntentRequest, PaymentError, PaymentErrorCode, PaymentGateway, PaymentIntent,
    PaymentMetadata,
};
