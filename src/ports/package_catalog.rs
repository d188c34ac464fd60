//! Package catalog port (read-only).

use async_trait::async_trait;

use crate::domain::entitlement::Package;
use crate::domain::foundation::{DomainError, PackageId};

/// Resolves package identifiers to price and credit terms.
///
/// Returns inactive packages too; callers decide whether `is_active` matters.
#[async_trait]
pub trait PackageCatalog: Send + Sync {
    /// Returns `None` if the catalog has no such package.
    async fn get_package(&self, id: &PackageId) -> Result<Option<Package>, DomainError>;
}
