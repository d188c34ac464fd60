//! In-memory identity directory.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::IdentityDirectory;

/// Knows a fixed set of users, or every user when built with `allow_all`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityDirectory {
    known: Arc<RwLock<HashSet<UserId>>>,
    allow_all: bool,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            known: Arc::new(RwLock::new(users.into_iter().collect())),
            allow_all: false,
        }
    }

    pub fn allow_all() -> Self {
        Self {
            known: Arc::default(),
            allow_all: true,
        }
    }

    pub async fn add(&self, user_id: UserId) {
        self.known.write().await.insert(user_id);
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn is_known(&self, user_id: &UserId) -> Result<bool, DomainError> {
        Ok(self.allow_all || self.known.read().await.contains(user_id))
    }
}
