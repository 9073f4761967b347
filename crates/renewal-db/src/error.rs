//! # Storage Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──────┐                                                   │
//! │  MigrateError ─────┼──► DbError ──► JobError (renewal-jobs)            │
//! │  bad TEXT money ───┘                  │                                 │
//! │                                       ├─ save/submit: returned          │
//! │                                       └─ sweep: counted per record      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for the given key.
    ///
    /// ## When This Occurs
    /// - `require` on an unknown record ID
    /// - A stage write or update that matched zero rows
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A primary key or UNIQUE index rejected the row.
    ///
    /// ## When This Occurs
    /// - Inserting a renewal record whose ID is taken
    #[error("Already exists: {constraint}")]
    UniqueViolation { constraint: String },

    /// An item row points at a missing record.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A stored value could not be decoded into its domain type.
    ///
    /// ## When This Occurs
    /// - A money column holds text that is not a decimal
    /// - A row was edited by hand
    #[error("Invalid {column} value '{value}': {reason}")]
    InvalidData {
        column: String,
        value: String,
        reason: String,
    },

    /// The file could not be opened or created.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// No pool connection became free within the acquire timeout.
    #[error("Timed out waiting for a database connection")]
    PoolTimedOut,

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_data(
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        DbError::InvalidData {
            column: column.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// ## Mapping
/// ```text
/// RowNotFound                    → NotFound
/// Database, UniqueViolation      → UniqueViolation  ("renewal_records.id")
/// Database, ForeignKeyViolation  → ForeignKeyViolation
/// PoolTimedOut                   → PoolTimedOut
/// PoolClosed                     → ConnectionFailed
/// anything else                  → QueryFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => {
                // "UNIQUE constraint failed: renewal_records.id"
                let message = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        constraint: message
                            .rsplit(": ")
                            .next()
                            .unwrap_or(message)
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => {
                        DbError::ForeignKeyViolation(message.to_string())
                    }
                    _ => DbError::QueryFailed(message.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolTimedOut,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_data_message() {
        let err = DbError::invalid_data("net_total", "12,5", "invalid decimal");
        assert_eq!(err.to_string(), "Invalid net_total value '12,5': invalid decimal");
    }

    #[test]
    fn test_sqlx_mapping() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolTimedOut
        ));
    }
}
