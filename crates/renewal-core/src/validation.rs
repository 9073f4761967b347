//! # Validation
//!
//! Field checks run before a record is saved. Line quantities and rates
//! may be negative (credit lines).

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Requires both license dates and `end > start`.
///
/// ## Returns
/// * `Ok((start, end))` - Both dates, validated
/// * `Err(Validation(Required))` - A date is missing
/// * `Err(InvalidDateRange)` - End is on or before start
pub fn validate_license_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> CoreResult<(NaiveDate, NaiveDate)> {
    let start = start.ok_or_else(|| required("license_start"))?;
    let end = end.ok_or_else(|| required("license_end"))?;

    if end <= start {
        return Err(CoreError::InvalidDateRange { start, end });
    }
    Ok((start, end))
}

/// Parses a three-letter currency code, upper-casing it.
pub fn parse_currency_code(code: &str) -> Result<String, ValidationError> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: format!("'{}' is not a three-letter code", code),
        });
    }
    Ok(code.to_ascii_uppercase())
}

fn required(field: &str) -> CoreError {
    ValidationError::Required {
        field: field.to_string(),
    }
    .into()
}
