//! In-memory adapters.
//!
//! Process-local implementations of the storage and directory ports, used by
//! tests and for running the service without a database.

mod entitlement_store;
mod identity_directory;
mod package_catalog;

pub use entitlement_store::InMemoryEntitlementStore;
pub use identity_directory::InMemoryIdentityDirectory;
pub use package_catalog::InMemoryPackageCatalog;
