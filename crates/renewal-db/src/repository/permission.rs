//! # Permission Repository
//!
//! Per-user action grants. Manual re-classification requires `write`.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Action required to re-classify a record by hand.
pub const WRITE_ACTION: &str = "write";

/// Repository for user permission grants.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: SqlitePool,
}

impl PermissionRepository {
    /// Creates a new PermissionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PermissionRepository { pool }
    }

    /// Grants an action to a user. Granting twice is a no-op.
    pub async fn grant(&self, user_id: &str, action: &str) -> DbResult<()> {
        debug!(user = %user_id, action = %action, "Granting permission");

        sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, action) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(action)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Revokes an action. Returns false if the user didn't have it.
    pub async fn revoke(&self, user_id: &str, action: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE user_id = ?1 AND action = ?2")
            .bind(user_id)
            .bind(action)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns true if the user holds the action.
    pub async fn has(&self, user_id: &str, action: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_permissions WHERE user_id = ?1 AND action = ?2",
        )
        .bind(user_id)
        .bind(action)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let perms = db.permissions();

        assert!(!perms.has("alice", WRITE_ACTION).await.unwrap());

        perms.grant("alice", WRITE_ACTION).await.unwrap();
        perms.grant("alice", WRITE_ACTION).await.unwrap();
        assert!(perms.has("alice", WRITE_ACTION).await.unwrap());
        assert!(!perms.has("bob", WRITE_ACTION).await.unwrap());

        assert!(perms.revoke("alice", WRITE_ACTION).await.unwrap());
        assert!(!perms.revoke("alice", WRITE_ACTION).await.unwrap());
        assert!(!perms.has("alice", WRITE_ACTION).await.unwrap());
    }
}
