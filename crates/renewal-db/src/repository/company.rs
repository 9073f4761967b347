//! # Company Repository
//!
//! A company's default currency is the base currency every record it
//! owns converts into.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for company lookups.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    /// Creates a new CompanyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// Inserts a company or replaces its default currency.
    pub async fn upsert(&self, name: &str, default_currency: Option<&str>) -> DbResult<()> {
        debug!(company = %name, currency = ?default_currency, "Upserting company");

        sqlx::query(
            r#"
            INSERT INTO companies (name, default_currency)
            VALUES (?1, ?2)
            ON CONFLICT (name) DO UPDATE SET default_currency = excluded.default_currency
            "#,
        )
        .bind(name)
        .bind(default_currency)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the company's default currency.
    ///
    /// `None` for an unknown company or one without a default currency;
    /// the currency resolver treats both as "base currency unknown".
    pub async fn default_currency(&self, name: &str) -> DbResult<Option<String>> {
        let currency: Option<Option<String>> =
            sqlx::query_scalar("SELECT default_currency FROM companies WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(currency.flatten())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_default_currency() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let companies = db.companies();

        assert_eq!(companies.default_currency("Acme").await.unwrap(), None);

        companies.upsert("Acme", None).await.unwrap();
        assert_eq!(companies.default_currency("Acme").await.unwrap(), None);

        companies.upsert("Acme", Some("GHS")).await.unwrap();
        assert_eq!(
            companies.default_currency("Acme").await.unwrap().as_deref(),
            Some("GHS")
        );
    }
}
