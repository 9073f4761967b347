//! # Renewal Stage Classification
//!
//! Maps a reference date and a license period onto one of six stages.
//!
//! ## Stage Timeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Open   │   Running   │  90 Days  │  60 Days  │  30 Days  │  Expired  │
//! │ ─────────┼─────────────┼───────────┼───────────┼───────────┼────────── │
//! │        start        end-90d     end-60d     end-30d       end          │
//! │                                                                         │
//! │  Lower bounds are inclusive: on `end-90d` the stage is already          │
//! │  "90 Days to Expiry", on `end` it is already "Expired".                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rule Order
//! The rules are checked from the tightest upper bound outward, NOT in
//! chronological order. For a license shorter than 90 days the windows
//! overlap `start`, and only this order gives "Open" before the start date
//! and the closest expiry window afterwards:
//!
//! ```text
//! 1. now <  start    → Open
//! 2. now >= end      → Expired
//! 3. now >= end-30d  → 30 Days to Expiry
//! 4. now >= end-60d  → 60 Days to Expiry
//! 5. now >= end-90d  → 90 Days to Expiry
//! 6. otherwise       → Running
//! ```

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{RenewalRecord, RenewalStage};
use crate::{NINETY_DAY_WINDOW, SIXTY_DAY_WINDOW, THIRTY_DAY_WINDOW};

// =============================================================================
// Rule Table
// =============================================================================

/// The date condition of one classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    BeforeStart,
    OnOrAfterEnd,
    WithinDaysOfEnd(u64),
    Always,
}

/// Ordered `(condition, stage)` pairs; first match wins.
const STAGE_RULES: [(Boundary, RenewalStage); 6] = [
    (Boundary::BeforeStart, RenewalStage::Open),
    (Boundary::OnOrAfterEnd, RenewalStage::Expired),
    (
        Boundary::WithinDaysOfEnd(THIRTY_DAY_WINDOW),
        RenewalStage::ThirtyDaysToExpiry,
    ),
    (
        Boundary::WithinDaysOfEnd(SIXTY_DAY_WINDOW),
        RenewalStage::SixtyDaysToExpiry,
    ),
    (
        Boundary::WithinDaysOfEnd(NINETY_DAY_WINDOW),
        RenewalStage::NinetyDaysToExpiry,
    ),
    (Boundary::Always, RenewalStage::Running),
];

impl Boundary {
    fn matches(self, now: NaiveDate, start: NaiveDate, end: NaiveDate) -> CoreResult<bool> {
        Ok(match self {
            Boundary::BeforeStart => now < start,
            Boundary::OnOrAfterEnd => now >= end,
            Boundary::WithinDaysOfEnd(days) => {
                let threshold = end.checked_sub_days(Days::new(days)).ok_or_else(|| {
                    CoreError::classification(format!(
                        "{} days before {} is outside the supported calendar",
                        days, end
                    ))
                })?;
                now >= threshold
            }
            Boundary::Always => true,
        })
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Result of classifying a license period against a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub stage: RenewalStage,
    /// `end - now` in days; negative once expired.
    pub days_remaining: i64,
}

/// Classifies a license period.
///
/// ## Faults
/// Returns `ClassificationFault` when `end <= start` (a record that
/// bypassed save validation) or a threshold date cannot be represented.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use renewal_core::stage::classify;
/// use renewal_core::RenewalStage;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
///
/// let before = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
/// assert_eq!(classify(before, start, end).unwrap().stage, RenewalStage::Open);
///
/// let after = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
/// let expired = classify(after, start, end).unwrap();
/// assert_eq!(expired.stage, RenewalStage::Expired);
/// assert_eq!(expired.days_remaining, -10);
/// ```
pub fn classify(now: NaiveDate, start: NaiveDate, end: NaiveDate) -> CoreResult<Classification> {
    if end <= start {
        return Err(CoreError::classification(format!(
            "license end {} is not after license start {}",
            end, start
        )));
    }

    let days_remaining = end.signed_duration_since(now).num_days();

    for (boundary, stage) in STAGE_RULES {
        if boundary.matches(now, start, end)? {
            return Ok(Classification {
                stage,
                days_remaining,
            });
        }
    }

    // STAGE_RULES ends with Boundary::Always
    Err(CoreError::classification("no stage rule matched"))
}

/// Classifies optional dates; a missing date means "no stage", not an error.
pub fn classify_period(
    now: NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> CoreResult<Option<Classification>> {
    match (start, end) {
        (Some(start), Some(end)) => classify(now, start, end).map(Some),
        _ => Ok(None),
    }
}

/// Recomputes a record's stage fields in place.
///
/// The fields are cleared before evaluation, so on `Err` the record never
/// keeps a stale stage. Whether the error is fatal is the caller's call.
pub fn refresh_stage(record: &mut RenewalRecord, now: NaiveDate) -> CoreResult<Option<Classification>> {
    record.clear_stage();

    let result = classify_period(now, record.license_start, record.license_end)?;
    if let Some(c) = result {
        record.renewal_stage = Some(c.stage);
        record.days_remaining = Some(c.days_remaining);
    }
    Ok(result)
}

// =============================================================================
// Unit Tests
// =============================================================================
