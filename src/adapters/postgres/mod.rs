//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresEntitlementRepository` - Entitlement writes (unique insert, conditional activation)
//! - `PostgresEntitlementReader` - Balance and payment-status queries
//! - `PostgresPackageCatalog` - Package lookups
//! - `PostgresIdentityDirectory` - Known-user check against `users`

mod entitlement_reader;
mod entitlement_repository;
mod entitlement_row;
mod identity_directory;
mod package_catalog;

pub use entitlement_reader::PostgresEntitlementReader;
pub use entitlement_repository::PostgresEntitlementRepository;
pub use identity_directory::PostgresIdentityDirectory;
pub use package_catalog::PostgresPackageCatalog;
