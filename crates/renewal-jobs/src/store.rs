//! # Record Store
//!
//! The storage seam of the batch sweep.
//!
//! ## Transaction Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SqliteRecordStore                                                     │
//! │                                                                         │
//! │  candidates()  → pool (no transaction)                                 │
//! │  load()        ┐                                                        │
//! │  write_stage() ┴→ lazily opened BEGIN IMMEDIATE transaction            │
//! │  commit()      → COMMIT, next load/write opens a new one               │
//! │                                                                         │
//! │  Statement fails → ROLLBACK; the next load/write opens a fresh         │
//! │                    transaction and replays the batch's earlier writes  │
//! │                                                                         │
//! │  Dropped without commit → ROLLBACK of the open batch only;             │
//! │  earlier batches are already durable.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! User edits that arrive while a batch is open wait on the busy timeout
//! and go through once the batch commits.

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::error::JobResult;
use renewal_core::{RenewalRecord, RenewalStage};
use renewal_db::repository::renewal;
use renewal_db::{begin_write, DbError, DbResult};

/// Storage operations the sweep needs.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// IDs of submitted records with both license dates set.
    async fn candidates(&mut self) -> JobResult<Vec<String>>;

    async fn load(&mut self, id: &str) -> JobResult<Option<RenewalRecord>>;

    /// Writes stage and days only. Status and modification time are left
    /// untouched.
    async fn write_stage(
        &mut self,
        id: &str,
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
    ) -> JobResult<()>;

    /// Makes every write since the previous commit durable.
    async fn commit(&mut self) -> JobResult<()>;
}

/// A stage write accepted in the open batch.
#[derive(Debug, Clone)]
struct StageWrite {
    id: String,
    stage: Option<RenewalStage>,
    days_remaining: Option<i64>,
}

/// [`RecordStore`] over the SQLite database.
pub struct SqliteRecordStore {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    pending: Vec<StageWrite>,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteRecordStore {
            pool,
            tx: None,
            pending: Vec::new(),
        }
    }

    async fn tx(&mut self) -> JobResult<&mut Transaction<'static, Sqlite>> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.open().await?,
        };
        Ok(self.tx.insert(tx))
    }

    /// Starts a write transaction and re-applies the writes already
    /// accepted in this batch.
    async fn open(&self) -> JobResult<Transaction<'static, Sqlite>> {
        debug!(replay = self.pending.len(), "Opening sweep transaction");
        let mut tx = begin_write(&self.pool).await?;

        for write in &self.pending {
            match renewal::write_stage(&mut tx, &write.id, write.stage, write.days_remaining).await {
                Ok(()) => {}
                // deleted since it was written; nothing left to update
                Err(DbError::NotFound { .. }) => {
                    debug!(record_id = %write.id, "Skipping replay of removed record")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(tx)
    }

    /// Drops the open transaction after a failed statement, unless the
    /// failure was a plain missing row.
    async fn settle<T>(&mut self, result: DbResult<T>) -> JobResult<T> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !matches!(err, DbError::NotFound { .. }) {
            if let Some(tx) = self.tx.take() {
                warn!(
                    error = %err,
                    pending = self.pending.len(),
                    "Rolling back sweep transaction"
                );
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Sweep rollback failed");
                }
            }
        }
        Err(err.into())
    }
}

impl RecordStore for SqliteRecordStore {
    async fn candidates(&mut self) -> JobResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        Ok(renewal::candidate_ids(&mut conn).await?)
    }

    async fn load(&mut self, id: &str) -> JobResult<Option<RenewalRecord>> {
        let result = renewal::fetch(self.tx().await?, id).await;
        self.settle(result).await
    }

    async fn write_stage(
        &mut self,
        id: &str,
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
    ) -> JobResult<()> {
        let result = renewal::write_stage(self.tx().await?, id, stage, days_remaining).await;
        self.settle(result).await?;

        self.pending.push(StageWrite {
            id: id.to_string(),
            stage,
            days_remaining,
        });
        Ok(())
    }

    async fn commit(&mut self) -> JobResult<()> {
        if self.tx.is_none() && self.pending.is_empty() {
            return Ok(());
        }

        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.open().await?,
        };
        tx.commit().await?;

        debug!(writes = self.pending.len(), "Committed sweep batch");
        self.pending.clear();
        Ok(())
    }
}
