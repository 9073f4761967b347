//! # Error Types
//!
//! Domain-specific error types for renewal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  renewal-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations and faults              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  renewal-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  renewal-jobs errors (separate crate)                                  │
//! │  └── JobError         - Service / sweep / config failures              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → JobError → CLI (anyhow)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//! ```text
//! InvalidDateRange, ExchangeRateUnavailable  → block the save (user-facing)
//! ClassificationFault                        → fatal on save,
//!                                              logged + cleared in batch
//! PermissionDenied                           → structured outcome only
//! ```

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// License end date is not strictly after the start date.
    ///
    /// ## When This Occurs
    /// - Saving a record whose end date equals or precedes its start date
    #[error("License End Date ({end}) must be after License Start Date ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// No manual rate and no rate-table entry for the currency pair.
    ///
    /// ## User Workflow
    /// ```text
    /// Save record (currency: USD, company base: GHS, rate: empty)
    ///      │
    ///      ▼
    /// Rate table lookup USD → GHS: not found
    ///      │
    ///      ▼
    /// ExchangeRateUnavailable { from: "USD", to: "GHS" }
    ///      │
    ///      ▼
    /// User enters the exchange rate manually and saves again
    /// ```
    #[error(
        "Currency pair {from} to {to} not available in system. \
         Please enter the exchange rate manually."
    )]
    ExchangeRateUnavailable { from: String, to: String },

    /// Unexpected failure while evaluating the renewal stage.
    #[error("Renewal stage could not be calculated: {reason}")]
    ClassificationFault { reason: String },

    /// The caller lacks the right to perform `action` on the record.
    #[error("Insufficient permissions to {action} record {record_id}")]
    PermissionDenied { record_id: String, action: String },

    /// Record is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Saving a submitted record through the normal save path
    /// - Submitting an already submitted or cancelled record
    #[error("Record {record_id} is {status}, cannot {operation}")]
    InvalidStatus {
        record_id: String,
        status: String,
        operation: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds a classification fault from anything displayable.
    pub fn classification(reason: impl Into<String>) -> Self {
        CoreError::ClassificationFault {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g., unparsable date or decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_message() {
        let err = CoreError::InvalidDateRange {
            start: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "License End Date (2025-05-01) must be after License Start Date (2025-06-01)"
        );
    }

    #[test]
    fn test_rate_unavailable_message() {
        let err = CoreError::ExchangeRateUnavailable {
            from: "USD".to_string(),
            to: "GHS".to_string(),
        };
        assert!(err.to_string().starts_with("Currency pair USD to GHS not available"));
    }

    #[test]
    fn test_permission_denied_message() {
        let err = CoreError::PermissionDenied {
            record_id: "RT-1".into(),
            action: "write".into(),
        };
        assert_eq!(err.to_string(), "Insufficient permissions to write record RT-1");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "license_start".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: license_start is required");
    }
}
