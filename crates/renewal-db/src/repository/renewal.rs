//! # Renewal Repository
//!
//! Database operations for renewal records and their line items.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Record Lifecycle                                  │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── insert() → record row + item rows (one transaction)            │
//! │                                                                         │
//! │  2. EDIT                                                               │
//! │     └── update() → record row rewritten, items replaced                │
//! │                                                                         │
//! │  3. SUBMIT                                                             │
//! │     └── update() with status = submitted                               │
//! │                                                                         │
//! │  4. DAILY SWEEP / MANUAL RE-CLASSIFY                                   │
//! │     └── write_stage() → renewal_stage + days_remaining only            │
//! │         (modified_at untouched, no user-edit history)                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connection-Level Functions
//! [`fetch`], [`write_stage`] and [`candidate_ids`] take a plain
//! `&mut SqliteConnection` so the sweep can run them inside its own
//! long-lived transaction. The repository methods wrap them for one-off use.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{parse_decimal, parse_optional_decimal};
use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use renewal_core::{DocStatus, LineItem, RenewalRecord, RenewalStage};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: String,
    company: Option<String>,
    currency: Option<String>,
    exchange_rate: Option<String>,
    license_start: Option<NaiveDate>,
    license_end: Option<NaiveDate>,
    net_total: String,
    net_total_base: String,
    renewal_stage: Option<RenewalStage>,
    days_remaining: Option<i64>,
    status: DocStatus,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    item_code: Option<String>,
    item_name: Option<String>,
    description: Option<String>,
    brand: Option<String>,
    item_group: Option<String>,
    uom: Option<String>,
    qty: String,
    rate: String,
    amount: String,
    base_rate: String,
    base_amount: String,
}

impl ItemRow {
    fn into_item(self) -> DbResult<LineItem> {
        Ok(LineItem {
            qty: parse_decimal("qty", &self.qty)?,
            rate: parse_decimal("rate", &self.rate)?,
            amount: parse_decimal("amount", &self.amount)?,
            base_rate: parse_decimal("base_rate", &self.base_rate)?,
            base_amount: parse_decimal("base_amount", &self.base_amount)?,
            item_code: self.item_code,
            item_name: self.item_name,
            description: self.description,
            brand: self.brand,
            item_group: self.item_group,
            uom: self.uom,
        })
    }
}

impl RecordRow {
    fn into_record(self, items: Vec<LineItem>) -> DbResult<RenewalRecord> {
        Ok(RenewalRecord {
            exchange_rate: parse_optional_decimal("exchange_rate", self.exchange_rate.as_deref())?,
            net_total: parse_decimal("net_total", &self.net_total)?,
            net_total_base: parse_decimal("net_total_base", &self.net_total_base)?,
            id: self.id,
            company: self.company,
            currency: self.currency,
            license_start: self.license_start,
            license_end: self.license_end,
            items,
            renewal_stage: self.renewal_stage,
            days_remaining: self.days_remaining,
            status: self.status,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

// =============================================================================
// Connection-Level Operations
// =============================================================================

/// Loads a record with its items, ordered by position.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<RenewalRecord>> {
    let row: Option<RecordRow> = sqlx::query_as(
        r#"
        SELECT
            id, company, currency, exchange_rate,
            license_start, license_end,
            net_total, net_total_base,
            renewal_stage, days_remaining,
            status, created_at, modified_at
        FROM renewal_records
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let item_rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT
            item_code, item_name, description, brand, item_group, uom,
            qty, rate, amount, base_rate, base_amount
        FROM renewal_items
        WHERE record_id = ?1
        ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let items = item_rows
        .into_iter()
        .map(ItemRow::into_item)
        .collect::<DbResult<Vec<_>>>()?;

    row.into_record(items).map(Some)
}

/// Writes only the stage fields of a record.
///
/// `modified_at` is deliberately left alone: this is a system update, not
/// a user edit.
pub async fn write_stage(
    conn: &mut SqliteConnection,
    id: &str,
    stage: Option<RenewalStage>,
    days_remaining: Option<i64>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE renewal_records SET renewal_stage = ?1, days_remaining = ?2 WHERE id = ?3",
    )
    .bind(stage)
    .bind(days_remaining)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("RenewalRecord", id));
    }
    Ok(())
}

/// IDs of submitted records with both license dates set, ordered by ID.
pub async fn candidate_ids(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM renewal_records
        WHERE status = 'submitted'
          AND license_start IS NOT NULL
          AND license_end IS NOT NULL
        ORDER BY id
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

async fn insert_row(conn: &mut SqliteConnection, record: &RenewalRecord) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO renewal_records (
            id, company, currency, exchange_rate,
            license_start, license_end,
            net_total, net_total_base,
            renewal_stage, days_remaining,
            status, created_at, modified_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6,
            ?7, ?8,
            ?9, ?10,
            ?11, ?12, ?13
        )
        "#,
    )
    .bind(&record.id)
    .bind(&record.company)
    .bind(&record.currency)
    .bind(record.exchange_rate.map(|r| r.to_string()))
    .bind(record.license_start)
    .bind(record.license_end)
    .bind(record.net_total.to_string())
    .bind(record.net_total_base.to_string())
    .bind(record.renewal_stage)
    .bind(record.days_remaining)
    .bind(record.status)
    .bind(record.created_at)
    .bind(record.modified_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn update_row(conn: &mut SqliteConnection, record: &RenewalRecord) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE renewal_records SET
            company = ?2,
            currency = ?3,
            exchange_rate = ?4,
            license_start = ?5,
            license_end = ?6,
            net_total = ?7,
            net_total_base = ?8,
            renewal_stage = ?9,
            days_remaining = ?10,
            status = ?11,
            modified_at = ?12
        WHERE id = ?1
        "#,
    )
    .bind(&record.id)
    .bind(&record.company)
    .bind(&record.currency)
    .bind(record.exchange_rate.map(|r| r.to_string()))
    .bind(record.license_start)
    .bind(record.license_end)
    .bind(record.net_total.to_string())
    .bind(record.net_total_base.to_string())
    .bind(record.renewal_stage)
    .bind(record.days_remaining)
    .bind(record.status)
    .bind(record.modified_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("RenewalRecord", &record.id));
    }
    Ok(())
}

async fn replace_items(conn: &mut SqliteConnection, record: &RenewalRecord) -> DbResult<()> {
    sqlx::query("DELETE FROM renewal_items WHERE record_id = ?1")
        .bind(&record.id)
        .execute(&mut *conn)
        .await?;

    for (position, item) in record.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO renewal_items (
                record_id, position,
                item_code, item_name, description, brand, item_group, uom,
                qty, rate, amount, base_rate, base_amount
            ) VALUES (
                ?1, ?2,
                ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13
            )
            "#,
        )
        .bind(&record.id)
        .bind(position as i64)
        .bind(&item.item_code)
        .bind(&item.item_name)
        .bind(&item.description)
        .bind(&item.brand)
        .bind(&item.item_group)
        .bind(&item.uom)
        .bind(item.qty.to_string())
        .bind(item.rate.to_string())
        .bind(item.amount.to_string())
        .bind(item.base_rate.to_string())
        .bind(item.base_amount.to_string())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for renewal record operations.
#[derive(Debug, Clone)]
pub struct RenewalRepository {
    pool: SqlitePool,
}

impl RenewalRepository {
    /// Creates a new RenewalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RenewalRepository { pool }
    }

    /// Inserts a new record and its items in one transaction.
    pub async fn insert(&self, record: &RenewalRecord) -> DbResult<()> {
        debug!(id = %record.id, items = record.items.len(), "Inserting renewal record");

        let mut tx = begin_write(&self.pool).await?;
        insert_row(&mut tx, record).await?;
        replace_items(&mut tx, record).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Rewrites an existing record and replaces all of its items.
    ///
    /// ## Returns
    /// * `Err(NotFound)` - No record with this ID
    pub async fn update(&self, record: &RenewalRecord) -> DbResult<()> {
        debug!(id = %record.id, status = %record.status, "Updating renewal record");

        let mut tx = begin_write(&self.pool).await?;
        update_row(&mut tx, record).await?;
        replace_items(&mut tx, record).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Gets a record by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<RenewalRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a record by ID, failing with `NotFound` if it doesn't exist.
    pub async fn require(&self, id: &str) -> DbResult<RenewalRecord> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("RenewalRecord", id))
    }

    /// Writes the stage fields only; see [`write_stage`].
    pub async fn update_stage(
        &self,
        id: &str,
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
    ) -> DbResult<()> {
        debug!(id = %id, stage = ?stage, days = ?days_remaining, "Updating renewal stage");

        let mut conn = self.pool.acquire().await?;
        write_stage(&mut conn, id, stage, days_remaining).await
    }

    /// IDs the daily sweep should visit.
    pub async fn sweep_candidates(&self) -> DbResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        candidate_ids(&mut conn).await
    }

    /// Counts records, optionally by stage.
    pub async fn count(&self, stage: Option<RenewalStage>) -> DbResult<i64> {
        let count: i64 = match stage {
            Some(stage) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM renewal_records WHERE renewal_stage = ?1")
                    .bind(stage)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM renewal_records")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
