//! # Exchange Rate Repository
//!
//! Directional currency pairs: a `USD → GHS` row says nothing about
//! `GHS → USD`.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::parse_decimal;
use crate::error::DbResult;
use renewal_core::RateTable;

/// Repository for the exchange-rate table.
#[derive(Debug, Clone)]
pub struct ExchangeRateRepository {
    pool: SqlitePool,
}

impl ExchangeRateRepository {
    /// Creates a new ExchangeRateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExchangeRateRepository { pool }
    }

    /// Inserts or replaces the rate for one direction of a pair.
    pub async fn upsert(&self, from: &str, to: &str, rate: Decimal) -> DbResult<()> {
        debug!(from = %from, to = %to, rate = %rate, "Upserting exchange rate");

        sqlx::query(
            r#"
            INSERT INTO exchange_rates (from_currency, to_currency, exchange_rate, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (from_currency, to_currency)
            DO UPDATE SET exchange_rate = excluded.exchange_rate,
                          updated_at = excluded.updated_at
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(rate.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Looks up a single pair.
    pub async fn find(&self, from: &str, to: &str) -> DbResult<Option<Decimal>> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT exchange_rate FROM exchange_rates WHERE from_currency = ?1 AND to_currency = ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|r| parse_decimal("exchange_rate", &r)).transpose()
    }

    /// Loads the whole table for the in-memory resolver.
    pub async fn load_table(&self) -> DbResult<RateTable> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT from_currency, to_currency, exchange_rate FROM exchange_rates",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut table = RateTable::new();
        for (from, to, rate) in rows {
            let rate = parse_decimal("exchange_rate", &rate)?;
            table.insert(from, to, rate);
        }

        if table.is_empty() {
            warn!("Exchange rate table is empty; foreign-currency records need a manual rate");
        } else {
            debug!(pairs = table.len(), "Loaded exchange rate table");
        }
        Ok(table)
    }
}
