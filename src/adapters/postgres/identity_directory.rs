//! PostgreSQL implementation of IdentityDirectory.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::IdentityDirectory;

pub struct PostgresIdentityDirectory {
    pool: PgPool,
}

impl PostgresIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PostgresIdentityDirectory {
    async fn is_known(&self, user_id: &UserId) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to look up user: {}", e)))
    }
}
