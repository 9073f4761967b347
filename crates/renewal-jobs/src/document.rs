//! # Document Service
//!
//! Persists renewal records through the save pipeline and handles manual
//! re-classification.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(record)                                                          │
//! │    company → base currency ─┐                                          │
//! │    exchange_rates table ────┼─► document::prepare_for_save ─► insert/  │
//! │    clock.today() ───────────┘                                  update  │
//! │                                                                         │
//! │  submit(id)                                                            │
//! │    load ─► document::submit ─► update ─► log "Renewal stage set to …"  │
//! │                                                                         │
//! │  reclassify(id, user)                                                  │
//! │    PermissionCheck ─► load ─► classify ─► write_stage (out-of-band)    │
//! │         │                        │                                      │
//! │         ▼                        ▼                                      │
//! │    PermissionDenied       Updated { stage, days, message }             │
//! │                           Failed { error }                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::clock::SystemClock;
use crate::error::{JobError, JobResult};
use renewal_core::document::{prepare_for_save, submit};
use renewal_core::stage::classify_period;
use renewal_core::{stage_label, Clock, RenewalRecord, RenewalStage};
use renewal_db::{Database, PermissionRepository, WRITE_ACTION};

// =============================================================================
// Permission Check
// =============================================================================

/// Decides whether a user may perform an action on a record.
#[allow(async_fn_in_trait)]
pub trait PermissionCheck {
    async fn is_allowed(&self, user: &str, record_id: &str, action: &str) -> JobResult<bool>;
}

/// Grants are per user and action; they apply to every record.
impl PermissionCheck for PermissionRepository {
    async fn is_allowed(&self, user: &str, _record_id: &str, action: &str) -> JobResult<bool> {
        Ok(self.has(user, action).await?)
    }
}

// =============================================================================
// Reclassify Outcome
// =============================================================================

/// Result of a manual re-classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReclassifyOutcome {
    Updated {
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
        message: String,
    },
    PermissionDenied {
        record_id: String,
        user: String,
    },
    Failed {
        error: String,
    },
}

impl ReclassifyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReclassifyOutcome::Updated { .. })
    }
}

// =============================================================================
// Document Service
// =============================================================================

/// Save, submit and re-classify renewal records.
#[derive(Debug, Clone)]
pub struct DocumentService<C = SystemClock> {
    db: Database,
    clock: C,
}

impl DocumentService<SystemClock> {
    pub fn new(db: Database) -> Self {
        DocumentService {
            db,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> DocumentService<C> {
    /// Uses `clock` for "today" instead of the system date.
    pub fn with_clock(db: Database, clock: C) -> Self {
        DocumentService { db, clock }
    }

    /// Runs the save pipeline on a draft and persists it.
    ///
    /// Inserts the record if its ID is new, otherwise rewrites it.
    /// Nothing is written when the pipeline fails.
    pub async fn save(&self, mut record: RenewalRecord) -> JobResult<RenewalRecord> {
        let base_currency = self.base_currency(&record).await?;
        let rates = self.db.exchange_rates().load_table().await?;

        prepare_for_save(&mut record, base_currency.as_deref(), &rates, self.clock.today())?;
        record.modified_at = Utc::now();

        let repo = self.db.renewals();
        match repo.get(&record.id).await? {
            Some(existing) => {
                if existing.status != record.status {
                    return Err(renewal_core::CoreError::InvalidStatus {
                        record_id: record.id.clone(),
                        status: existing.status.to_string(),
                        operation: "save".to_string(),
                    }
                    .into());
                }
                repo.update(&record).await?
            }
            None => repo.insert(&record).await?,
        }

        info!(
            record_id = %record.id,
            net_total = %record.net_total,
            net_total_base = %record.net_total_base,
            stage = stage_label(record.renewal_stage),
            "Renewal record saved"
        );
        Ok(record)
    }

    /// Submits a stored draft.
    pub async fn submit(&self, id: &str) -> JobResult<RenewalRecord> {
        let mut record = self.db.renewals().require(id).await?;
        let base_currency = self.base_currency(&record).await?;
        let rates = self.db.exchange_rates().load_table().await?;

        submit(&mut record, base_currency.as_deref(), &rates, self.clock.today())?;
        record.modified_at = Utc::now();
        self.db.renewals().update(&record).await?;

        info!(
            record_id = %record.id,
            days_remaining = ?record.days_remaining,
            "Renewal stage set to {}",
            stage_label(record.renewal_stage)
        );
        Ok(record)
    }

    /// Manual re-classification, checked against the stored grants.
    pub async fn reclassify(&self, id: &str, user: &str) -> ReclassifyOutcome {
        self.reclassify_with(id, user, &self.db.permissions()).await
    }

    /// Manual re-classification with an explicit permission check.
    ///
    /// Never fails: every problem becomes an outcome variant.
    pub async fn reclassify_with<P: PermissionCheck>(
        &self,
        id: &str,
        user: &str,
        permissions: &P,
    ) -> ReclassifyOutcome {
        match permissions.is_allowed(user, id, WRITE_ACTION).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(record_id = %id, user = %user, "Re-classification denied");
                return ReclassifyOutcome::PermissionDenied {
                    record_id: id.to_string(),
                    user: user.to_string(),
                };
            }
            Err(e) => return self.failed(id, e),
        }

        match self.reclassify_record(id).await {
            Ok((previous, stage, days_remaining)) => {
                let message = format!(
                    "Renewal stage updated from \"{}\" to \"{}\"",
                    stage_label(previous),
                    stage_label(stage)
                );
                info!(record_id = %id, user = %user, "{}", message);
                ReclassifyOutcome::Updated {
                    stage,
                    days_remaining,
                    message,
                }
            }
            Err(e) => self.failed(id, e),
        }
    }

    async fn reclassify_record(
        &self,
        id: &str,
    ) -> JobResult<(Option<RenewalStage>, Option<RenewalStage>, Option<i64>)> {
        let repo = self.db.renewals();
        let record = repo.require(id).await?;

        match classify_period(self.clock.today(), record.license_start, record.license_end) {
            Ok(classification) => {
                let stage = classification.map(|c| c.stage);
                let days = classification.map(|c| c.days_remaining);
                repo.update_stage(id, stage, days).await?;
                Ok((record.renewal_stage, stage, days))
            }
            Err(fault) => {
                if let Err(e) = repo.update_stage(id, None, None).await {
                    warn!(record_id = %id, error = %e, "Could not clear stage after fault");
                }
                Err(fault.into())
            }
        }
    }

    fn failed(&self, id: &str, e: JobError) -> ReclassifyOutcome {
        error!(
            record_id = %id,
            operation = "reclassify",
            at = %Utc::now(),
            error = %e,
            "Manual re-classification failed"
        );
        ReclassifyOutcome::Failed {
            error: e.to_string(),
        }
    }

    async fn base_currency(&self, record: &RenewalRecord) -> JobResult<Option<String>> {
        match record.company.as_deref() {
            Some(company) => Ok(self.db.companies().default_currency(company).await?),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use renewal_core::{CoreError, DocStatus, FixedClock, LineItem};
    use renewal_db::DbConfig;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn service(today: NaiveDate) -> DocumentService<FixedClock> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.companies().upsert("Acme Ghana", Some("GHS")).await.unwrap();
        db.exchange_rates().upsert("USD", "GHS", d("1.5")).await.unwrap();
        DocumentService::with_clock(db, FixedClock(today))
    }

    fn draft(id: &str) -> RenewalRecord {
        RenewalRecord::new(id, Utc::now())
            .with_currency("Acme Ghana", "USD")
            .with_license(date(2025, 1, 1), date(2025, 12, 31))
            .with_item(LineItem::new(d("2"), d("100")))
            .with_item(LineItem::new(d("1"), d("50")))
    }

    struct AllowAll;
    impl PermissionCheck for AllowAll {
        async fn is_allowed(&self, _: &str, _: &str, _: &str) -> JobResult<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_save_resolves_rate_and_totals() {
        let svc = service(date(2025, 10, 15)).await;
        let saved = svc.save(draft("rt-1")).await.unwrap();

        assert_eq!(saved.exchange_rate, Some(d("1.5")));
        assert_eq!(saved.net_total, d("250"));
        assert_eq!(saved.net_total_base, d("375"));

        let stored = svc.db.renewals().require("rt-1").await.unwrap();
        assert_eq!(stored.net_total_base, d("375"));
        assert_eq!(stored.renewal_stage, Some(RenewalStage::NinetyDaysToExpiry));
        assert_eq!(stored.days_remaining, Some(77));
    }

    #[tokio::test]
    async fn test_save_without_rate_writes_nothing() {
        let svc = service(date(2025, 10, 15)).await;
        let mut record = draft("rt-1");
        record.currency = Some("EUR".into());

        let err = svc.save(record).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::Core(CoreError::ExchangeRateUnavailable { .. })
        ));
        assert!(svc.db.renewals().get("rt-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_company_skips_conversion() {
        let svc = service(date(2025, 10, 15)).await;
        let mut record = draft("rt-1");
        record.company = Some("Nobody Ltd".into());

        let saved = svc.save(record).await.unwrap();
        assert_eq!(saved.exchange_rate, None);
        assert_eq!(saved.net_total_base, saved.net_total);
    }

    #[tokio::test]
    async fn test_submit_then_save_is_rejected() {
        let svc = service(date(2025, 10, 15)).await;
        svc.save(draft("rt-1")).await.unwrap();

        let submitted = svc.submit("rt-1").await.unwrap();
        assert_eq!(submitted.status, DocStatus::Submitted);
        assert_eq!(
            svc.db.renewals().sweep_candidates().await.unwrap(),
            vec!["rt-1".to_string()]
        );

        assert!(svc.save(submitted).await.is_err());
        assert!(svc.save(draft("rt-1")).await.is_err());
        assert!(matches!(svc.submit("missing").await, Err(JobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reclassify_requires_write_permission() {
        let svc = service(date(2025, 10, 15)).await;
        svc.save(draft("rt-1")).await.unwrap();

        let outcome = svc.reclassify("rt-1", "viewer").await;
        assert_eq!(
            outcome,
            ReclassifyOutcome::PermissionDenied {
                record_id: "rt-1".into(),
                user: "viewer".into()
            }
        );
    }

    #[tokio::test]
    async fn test_reclassify_updates_stage_without_touching_modified() {
        let svc = service(date(2025, 6, 1)).await;
        svc.save(draft("rt-1")).await.unwrap();
        svc.db.permissions().grant("ama", WRITE_ACTION).await.unwrap();
        let before = svc.db.renewals().require("rt-1").await.unwrap();
        assert_eq!(before.renewal_stage, Some(RenewalStage::Running));

        let later = DocumentService::with_clock(svc.db.clone(), FixedClock(date(2025, 12, 15)));
        let outcome = later.reclassify("rt-1", "ama").await;

        assert_eq!(
            outcome,
            ReclassifyOutcome::Updated {
                stage: Some(RenewalStage::ThirtyDaysToExpiry),
                days_remaining: Some(16),
                message: "Renewal stage updated from \"Running\" to \"30 Days to Expiry\"".into(),
            }
        );

        let after = svc.db.renewals().require("rt-1").await.unwrap();
        assert_eq!(after.renewal_stage, Some(RenewalStage::ThirtyDaysToExpiry));
        assert_eq!(after.modified_at, before.modified_at);
    }

    #[tokio::test]
    async fn test_reclassify_fault_clears_stage() {
        let svc = service(date(2025, 6, 1)).await;
        let mut broken = draft("rt-1");
        broken.license_start = Some(date(2026, 1, 1));
        broken.renewal_stage = Some(RenewalStage::Running);
        // bypasses the save pipeline
        svc.db.renewals().insert(&broken).await.unwrap();

        let outcome = svc.reclassify_with("rt-1", "ama", &AllowAll).await;
        assert!(matches!(outcome, ReclassifyOutcome::Failed { .. }));

        let stored = svc.db.renewals().require("rt-1").await.unwrap();
        assert_eq!(stored.renewal_stage, None);
    }

    #[tokio::test]
    async fn test_reclassify_missing_record() {
        let svc = service(date(2025, 6, 1)).await;
        let outcome = svc.reclassify_with("nope", "ama", &AllowAll).await;
        assert_eq!(
            outcome,
            ReclassifyOutcome::Failed {
                error: "Renewal record not found: nope".into()
            }
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ReclassifyOutcome::Updated {
            stage: Some(RenewalStage::Expired),
            days_remaining: Some(-2),
            message: "m".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "updated");
        assert_eq!(json["stage"], "Expired");
        assert_eq!(json["days_remaining"], -2);
        assert!(outcome.is_success());
    }
}
