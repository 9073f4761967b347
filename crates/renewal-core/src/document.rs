//! # Document Pipeline
//!
//! Recomputes every derived field of a record before it is persisted.
//!
//! ## Save Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  prepare_for_save(record, base_currency, rates, today)                 │
//! │       │                                                                 │
//! │       ├── 1. status must be Draft          → InvalidStatus             │
//! │       ├── 2. license dates set, end > start → Required/InvalidDateRange│
//! │       ├── 3. currency::resolve             → ExchangeRateUnavailable   │
//! │       ├── 4. calculator::compute_lines  (credit lines allowed)         │
//! │       ├── 5. calculator::compute_totals                                │
//! │       └── 6. stage::refresh_stage          → ClassificationFault       │
//! │                                              (fields cleared first)    │
//! │                                                                         │
//! │  Any Err leaves the record unfit for persisting; the caller discards it│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::calculator::{compute_lines, compute_totals};
use crate::currency::{resolve, RateLookup};
use crate::error::{CoreError, CoreResult};
use crate::stage::{refresh_stage, Classification};
use crate::types::{DocStatus, RenewalRecord};
use crate::validation::validate_license_dates;

/// Runs the save pipeline on a draft record.
///
/// Drafts are recomputed on every save, including the stage, so a draft
/// edited over several days always shows the stage as of its last save.
pub fn prepare_for_save<L>(
    record: &mut RenewalRecord,
    base_currency: Option<&str>,
    rates: &L,
    today: NaiveDate,
) -> CoreResult<Option<Classification>>
where
    L: RateLookup + ?Sized,
{
    ensure_status(record, DocStatus::Draft, "save")?;
    recalculate(record, base_currency, rates, today)
}

/// Runs the save pipeline and marks the record submitted.
///
/// The record is left as Draft if any step fails.
pub fn submit<L>(
    record: &mut RenewalRecord,
    base_currency: Option<&str>,
    rates: &L,
    today: NaiveDate,
) -> CoreResult<Option<Classification>>
where
    L: RateLookup + ?Sized,
{
    ensure_status(record, DocStatus::Draft, "submit")?;
    let classification = recalculate(record, base_currency, rates, today)?;
    record.status = DocStatus::Submitted;
    Ok(classification)
}

/// Steps 2 to 6 of the save pipeline, without the status check.
pub fn recalculate<L>(
    record: &mut RenewalRecord,
    base_currency: Option<&str>,
    rates: &L,
    today: NaiveDate,
) -> CoreResult<Option<Classification>>
where
    L: RateLookup + ?Sized,
{
    validate_license_dates(record.license_start, record.license_end)?;

    record.exchange_rate = resolve(
        record.currency.as_deref(),
        base_currency,
        record.exchange_rate,
        rates,
    )?;

    compute_lines(
        &mut record.items,
        record.exchange_rate,
        record.currency.as_deref(),
        base_currency,
    );

    let totals = compute_totals(&record.items);
    record.net_total = totals.net_total;
    record.net_total_base = totals.net_total_base;

    refresh_stage(record, today)
}

fn ensure_status(record: &RenewalRecord, expected: DocStatus, operation: &str) -> CoreResult<()> {
    if record.status != expected {
        return Err(CoreError::InvalidStatus {
            record_id: record.id.clone(),
            status: record.status.to_string(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::RateTable;
    use crate::types::{LineItem, RenewalStage};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn usd_record() -> RenewalRecord {
        RenewalRecord::new("rt-1", Utc::now())
            .with_currency("Acme Ghana", "USD")
            .with_license(date(2025, 1, 1), date(2025, 12, 31))
            .with_item(LineItem::new(d("2"), d("100")).with_code("LIC-SEAT"))
            .with_item(LineItem::new(d("1"), d("50")).with_code("LIC-SUPPORT"))
    }

    fn rates() -> RateTable {
        RateTable::new().with_rate("USD", "GHS", d("1.5"))
    }

    #[test]
    fn test_full_pipeline() {
        let mut record = usd_record();
        let c = prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 10, 15))
            .unwrap()
            .unwrap();

        assert_eq!(record.exchange_rate, Some(d("1.5")));
        assert_eq!(record.net_total, d("250"));
        assert_eq!(record.net_total_base, d("375"));
        assert_eq!(c.stage, RenewalStage::NinetyDaysToExpiry);
        assert_eq!(record.renewal_stage, Some(RenewalStage::NinetyDaysToExpiry));
        assert_eq!(record.days_remaining, Some(77));
    }

    #[test]
    fn test_credit_line_reduces_totals() {
        let mut record = usd_record().with_item(LineItem::new(d("-1"), d("50")).with_code("CREDIT"));
        prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 10, 15)).unwrap();

        assert_eq!(record.items[2].amount, d("-50"));
        assert_eq!(record.items[2].base_amount, d("-75"));
        assert_eq!(record.net_total, d("200"));
        assert_eq!(record.net_total_base, d("300"));
    }

    #[test]
    fn test_missing_rate_blocks_save() {
        let mut record = usd_record();
        let err = prepare_for_save(&mut record, Some("GHS"), &RateTable::new(), date(2025, 10, 15))
            .unwrap_err();
        assert!(matches!(err, CoreError::ExchangeRateUnavailable { .. }));
    }

    #[test]
    fn test_manual_rate_is_kept() {
        let mut record = usd_record();
        record.exchange_rate = Some(d("2"));
        prepare_for_save(&mut record, Some("GHS"), &RateTable::new(), date(2025, 10, 15)).unwrap();
        assert_eq!(record.net_total_base, d("500"));
    }

    #[test]
    fn test_invalid_dates_block_save() {
        let mut record = usd_record();
        record.license_end = record.license_start;
        let err = prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 10, 15))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDateRange { .. }));

        record.license_end = None;
        let err = prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 10, 15))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_draft_recomputes_stage_each_save() {
        let mut record = usd_record();
        prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 6, 1)).unwrap();
        assert_eq!(record.renewal_stage, Some(RenewalStage::Running));

        prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 12, 15)).unwrap();
        assert_eq!(record.renewal_stage, Some(RenewalStage::ThirtyDaysToExpiry));
    }

    #[test]
    fn test_submit_then_save_is_rejected() {
        let mut record = usd_record();
        submit(&mut record, Some("GHS"), &rates(), date(2025, 10, 15)).unwrap();
        assert_eq!(record.status, DocStatus::Submitted);

        let err = prepare_for_save(&mut record, Some("GHS"), &rates(), date(2025, 10, 15))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatus { .. }));

        let err = submit(&mut record, Some("GHS"), &rates(), date(2025, 10, 15)).unwrap_err();
        assert_eq!(err.to_string(), "Record rt-1 is submitted, cannot submit");
    }

    #[test]
    fn test_failed_submit_stays_draft() {
        let mut record = usd_record();
        assert!(submit(&mut record, Some("GHS"), &RateTable::new(), date(2025, 10, 15)).is_err());
        assert_eq!(record.status, DocStatus::Draft);
    }

    #[test]
    fn test_same_currency_record() {
        let mut record = usd_record();
        record.exchange_rate = Some(d("9"));
        prepare_for_save(&mut record, Some("USD"), &RateTable::new(), date(2025, 10, 15)).unwrap();
        assert_eq!(record.exchange_rate, Some(Decimal::ONE));
        assert_eq!(record.net_total, record.net_total_base);
    }
}
