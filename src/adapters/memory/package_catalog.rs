//! In-memory package catalog.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entitlement::Package;
use crate::domain::foundation::{DomainError, PackageId, ValidationError};
use crate::ports::PackageCatalog;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPackageCatalog {
    packages: Arc<RwLock<HashMap<PackageId, Package>>>,
}

impl InMemoryPackageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from `packages`, rejecting any that fail validation.
    pub fn with_packages(
        packages: impl IntoIterator<Item = Package>,
    ) -> Result<Self, ValidationError> {
        let mut map = HashMap::new();
        for package in packages {
            package.validate()?;
            map.insert(package.id.clone(), package);
        }
        Ok(Self {
            packages: Arc::new(RwLock::new(map)),
        })
    }

    /// Insert or replace a package.
    pub async fn upsert(&self, package: Package) -> Result<(), ValidationError> {
        package.validate()?;
        self.packages.write().await.insert(package.id.clone(), package);
        Ok(())
    }

    pub async fn remove(&self, id: &PackageId) {
        self.packages.write().await.remove(id);
    }
}

#[async_trait]
impl PackageCatalog for InMemoryPackageCatalog {
    async fn get_package(&self, id: &PackageId) -> Result<Option<Package>, DomainError> {
        Ok(self.packages.read().await.get(id).cloned())
    }
}
