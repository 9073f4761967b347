//! # Job Error Types
//!
//! Error types for the document service, sweep and scheduler.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Job Error Categories                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Domain      │  │     Per-Record          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Core(CoreError)│  │  RecordUpdate           │ │
//! │  │  ConfigLoad     │  │  NotFound       │  │  (logged + counted by   │ │
//! │  │                 │  │  Database       │  │   the sweep)            │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use renewal_core::CoreError;

/// Result type alias for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors raised outside the pure core.
#[derive(Debug, Error)]
pub enum JobError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The record does not exist.
    #[error("Renewal record not found: {0}")]
    NotFound(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),

    /// One record failed during a batch; the batch continues.
    ///
    /// ## When This Occurs
    /// - The stored license dates make the classifier fault
    /// - Writing the stage fields fails
    #[error("Failed to update renewal stage for {record_id}: {source}")]
    RecordUpdate {
        record_id: String,
        #[source]
        source: Box<JobError>,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Shutdown channel closed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl JobError {
    /// Wraps an error with the record it happened on.
    pub fn record_update(record_id: impl Into<String>, source: JobError) -> Self {
        JobError::RecordUpdate {
            record_id: record_id.into(),
            source: Box::new(source),
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<renewal_db::DbError> for JobError {
    fn from(err: renewal_db::DbError) -> Self {
        match err {
            renewal_db::DbError::NotFound { id, .. } => JobError::NotFound(id),
            other => JobError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        renewal_db::DbError::from(err).into()
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for JobError {
    fn from(err: toml::de::Error) -> Self {
        JobError::ConfigLoadFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_update_display() {
        let err = JobError::record_update(
            "rt-7",
            CoreError::classification("license end 2025-01-01 is not after license start 2025-06-01").into(),
        );
        assert_eq!(
            err.to_string(),
            "Failed to update renewal stage for rt-7: Renewal stage could not be calculated: \
             license end 2025-01-01 is not after license start 2025-06-01"
        );
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: JobError = renewal_db::DbError::not_found("RenewalRecord", "rt-1").into();
        assert!(matches!(err, JobError::NotFound(id) if id == "rt-1"));
    }

    #[test]
    fn test_toml_error_is_load_failure() {
        let err: JobError = toml::from_str::<toml::Value>("[sweep").unwrap_err().into();
        assert!(matches!(err, JobError::ConfigLoadFailed(_)));
    }
}
