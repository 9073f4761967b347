//! # Connection Pool
//!
//! Opens the renewal database and hands out repositories.
//!
//! ## Who Holds What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RenewalConfig [database] ──► DbConfig ──► Database::new               │
//! │                                               │                         │
//! │                         ┌─────────────────────┼───────────────────┐     │
//! │                         ▼                     ▼                   ▼     │
//! │                  DocumentService        daily sweep          renewal CLI│
//! │                  (short writes)     (one tx per batch)      (reads, rate│
//! │                                                               set)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sweep keeps a write transaction open for a whole batch, so the file
//! is opened in WAL mode with a busy timeout: readers never block and a
//! second writer waits instead of failing with `SQLITE_BUSY`.
//!
//! Write transactions start with `BEGIN IMMEDIATE` ([`begin_write`]). A
//! deferred transaction that reads first holds a snapshot; if another
//! writer commits before its first write, SQLite fails the upgrade with
//! `SQLITE_BUSY` and the busy timeout does not retry it.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::company::CompanyRepository;
use crate::repository::exchange_rate::ExchangeRateRepository;
use crate::repository::permission::PermissionRepository;
use crate::repository::renewal::RenewalRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where and how to open the database.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/srv/renewals.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// How long to wait for a free pool connection.
    pub acquire_timeout: Duration,

    /// How long a writer waits on a lock held by another writer.
    pub busy_timeout: Duration,

    /// Apply pending migrations on open. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory database, migrated on open. Used by tests.
    ///
    /// Pinned to a single connection: every pool connection to `:memory:`
    /// would otherwise get its own empty database. A caller holding a
    /// transaction therefore blocks all other callers until it commits.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // foreign keys are off by default; renewal_items cascades on them
        Ok(options
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

/// Opens a transaction that takes the write lock up front, waiting out the
/// busy timeout if another writer holds it.
pub async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

// =============================================================================
// Database
// =============================================================================

/// Shared pool plus repository accessors. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening renewal database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            in_memory = config.is_in_memory(),
            "Pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The underlying pool. The sweep's record store opens its own
    /// transactions on it.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository::new(self.pool.clone())
    }

    pub fn exchange_rates(&self) -> ExchangeRateRepository {
        ExchangeRateRepository::new(self.pool.clone())
    }

    /// ## Example
    /// ```rust,ignore
    /// let record = db.renewals().require("rt-1").await?;
    /// ```
    pub fn renewals(&self) -> RenewalRepository {
        RenewalRepository::new(self.pool.clone())
    }

    pub fn permissions(&self) -> PermissionRepository {
        PermissionRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        debug!("Closing renewal database");
        self.pool.close().await;
    }
}
