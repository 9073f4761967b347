//! Schema migrations, embedded at compile time from `migrations/sqlite/`.
//!
//! ```text
//! 001_initial_schema.sql   companies, exchange_rates, renewal_records,
//!                          renewal_items, user_permissions
//! ```
//!
//! Applied files are recorded in `_sqlx_migrations`; a changed checksum on
//! an applied file fails startup, so schema changes go in a new numbered
//! file.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded. A no-op on an up-to-date file.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await.unwrap_or((MIGRATOR.migrations.len(), 0));
    debug!(total, applied, "Migration state before run");

    MIGRATOR.run(pool).await?;

    if applied < total {
        info!(applied = total - applied, "Applied renewal schema migrations");
    }
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        run_migrations(db.pool()).await.unwrap();

        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_status_before_first_run_fails() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        // bookkeeping table does not exist yet
        assert!(migration_status(db.pool()).await.is_err());
    }
}
