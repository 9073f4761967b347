//! # Batch Sweep
//!
//! Re-classifies every submitted record against today's date.
//!
//! ## Sweep Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run_sweep(store, clock, commit_every)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.candidates()  ── fails? → Err (nothing was written)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each id (sequential):                                             │
//! │     load → snapshot old stage → classify → write_stage                 │
//! │       │                                                                 │
//! │       ├── Ok, stage changed   → success += 1, push StageTransition     │
//! │       ├── Ok, stage unchanged → success += 1                           │
//! │       └── Err                 → failed += 1, log, continue             │
//! │                                 (fault: stage fields cleared first)    │
//! │       │                                                                 │
//! │       └── every `commit_every` records → store.commit()                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  final commit → SweepReport { total, success, failed, transitions }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Re-running the sweep on the same day finds no transitions.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{JobError, JobResult};
use crate::store::RecordStore;
use renewal_core::stage::classify_period;
use renewal_core::{Clock, StageTransition};

// =============================================================================
// Report
// =============================================================================

/// Aggregate result of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Date every record was classified against.
    pub run_date: NaiveDate,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Records whose stage changed, in processing order.
    pub transitions: Vec<StageTransition>,
}

impl SweepReport {
    fn new(run_date: NaiveDate, total: usize) -> Self {
        SweepReport {
            run_date,
            total,
            success: 0,
            failed: 0,
            transitions: Vec::new(),
        }
    }

    /// Logs the summary block and every transition.
    pub fn log_summary(&self) {
        info!(
            run_date = %self.run_date,
            total = self.total,
            success = self.success,
            failed = self.failed,
            stage_changes = self.transitions.len(),
            "Renewal stage sweep complete"
        );
        for transition in &self.transitions {
            info!(
                record_id = %transition.record_id,
                days_remaining = ?transition.days_remaining,
                "{}",
                transition
            );
        }
        if self.failed > 0 {
            warn!(failed = self.failed, "Some records could not be updated; see errors above");
        }
    }
}

// =============================================================================
// Sweep
// =============================================================================

/// Runs one sweep over all candidates.
///
/// ## Returns
/// * `Ok(report)` - Per-record failures are counted, not returned
/// * `Err(_)` - Listing candidates or committing a batch failed
pub async fn run_sweep<S, C>(store: &mut S, clock: &C, commit_every: usize) -> JobResult<SweepReport>
where
    S: RecordStore,
    C: Clock + ?Sized,
{
    let commit_every = commit_every.max(1);
    let today = clock.today();
    let ids = store.candidates().await?;

    info!(records = ids.len(), run_date = %today, "Starting renewal stage sweep");

    let mut report = SweepReport::new(today, ids.len());
    let mut uncommitted = 0;

    for (idx, id) in ids.iter().enumerate() {
        match sweep_one(store, id, today).await {
            Ok(Some(transition)) => {
                report.success += 1;
                report.transitions.push(transition);
            }
            Ok(None) => report.success += 1,
            Err(e) => {
                report.failed += 1;
                error!(
                    record_id = %id,
                    operation = "renewal_stage_sweep",
                    at = %Utc::now(),
                    error = %e,
                    "Failed to update renewal stage"
                );
            }
        }

        uncommitted += 1;
        if uncommitted == commit_every {
            store.commit().await?;
            uncommitted = 0;
            info!(processed = idx + 1, total = ids.len(), "Sweep progress");
        }
    }

    if uncommitted > 0 {
        store.commit().await?;
    }

    Ok(report)
}

/// Re-classifies one record. `Ok(None)` means the stage didn't change.
async fn sweep_one<S: RecordStore>(
    store: &mut S,
    id: &str,
    today: NaiveDate,
) -> JobResult<Option<StageTransition>> {
    let wrap = |e: JobError| JobError::record_update(id, e);

    let record = store
        .load(id)
        .await
        .map_err(wrap)?
        .ok_or_else(|| wrap(JobError::NotFound(id.to_string())))?;
    let previous = record.renewal_stage;

    let classification = match classify_period(today, record.license_start, record.license_end) {
        Ok(c) => c,
        Err(fault) => {
            if let Err(e) = store.write_stage(id, None, None).await {
                warn!(record_id = %id, error = %e, "Could not clear stage after fault");
            }
            return Err(wrap(fault.into()));
        }
    };

    let stage = classification.map(|c| c.stage);
    let days_remaining = classification.map(|c| c.days_remaining);

    store
        .write_stage(id, stage, days_remaining)
        .await
        .map_err(wrap)?;

    debug!(record_id = %id, stage = ?stage, days = ?days_remaining, "Record classified");

    Ok((previous != stage).then(|| StageTransition {
        record_id: id.to_string(),
        previous,
        current: stage,
        days_remaining,
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteRecordStore;
    use chrono::Days;
    use renewal_core::stage::classify;
    use renewal_core::{DocStatus, FixedClock, RenewalRecord, RenewalStage};
    use renewal_db::{Database, DbConfig};
    use std::collections::{BTreeMap, HashSet};

    // -------------------------------------------------------------------------
    // In-memory store
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct MemoryStore {
        records: BTreeMap<String, RenewalRecord>,
        failing_writes: HashSet<String>,
        commits: usize,
    }

    impl MemoryStore {
        fn add(&mut self, record: RenewalRecord) {
            self.records.insert(record.id.clone(), record);
        }

        fn stage_of(&self, id: &str) -> Option<RenewalStage> {
            self.records[id].renewal_stage
        }
    }

    impl RecordStore for MemoryStore {
        async fn candidates(&mut self) -> JobResult<Vec<String>> {
            Ok(self
                .records
                .values()
                .filter(|r| r.is_sweep_candidate())
                .map(|r| r.id.clone())
                .collect())
        }

        async fn load(&mut self, id: &str) -> JobResult<Option<RenewalRecord>> {
            Ok(self.records.get(id).cloned())
        }

        async fn write_stage(
            &mut self,
            id: &str,
            stage: Option<RenewalStage>,
            days_remaining: Option<i64>,
        ) -> JobResult<()> {
            if self.failing_writes.contains(id) {
                return Err(JobError::Database("disk I/O error".into()));
            }
            let record = self
                .records
                .get_mut(id)
                .ok_or_else(|| JobError::NotFound(id.to_string()))?;
            record.renewal_stage = stage;
            record.days_remaining = days_remaining;
            Ok(())
        }

        async fn commit(&mut self) -> JobResult<()> {
            self.commits += 1;
            Ok(())
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn submitted(id: &str, start: NaiveDate, end: NaiveDate) -> RenewalRecord {
        let mut record = RenewalRecord::new(id, Utc::now()).with_license(start, end);
        record.status = DocStatus::Submitted;
        record
    }

    /// 100 submitted records; ids 000, 040 and 080 end before they start.
    fn hundred_with_three_faulty() -> MemoryStore {
        let mut store = MemoryStore::default();
        let start = date(2025, 1, 1);
        for n in 0..100u64 {
            let id = format!("rt-{:03}", n);
            let end = if n % 40 == 0 {
                date(2024, 6, 1)
            } else {
                start.checked_add_days(Days::new(200 + n * 3)).unwrap()
            };
            let mut record = submitted(&id, start, end);
            record.renewal_stage = Some(RenewalStage::Running);
            record.days_remaining = Some(999);
            store.add(record);
        }
        store
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_hundred_records_three_faulty() {
        let mut store = hundred_with_three_faulty();
        let clock = FixedClock(date(2025, 6, 1));

        let report = run_sweep(&mut store, &clock, 50).await.unwrap();

        assert_eq!(report.total, 100);
        assert_eq!(report.success, 97);
        assert_eq!(report.failed, 3);

        for faulty in ["rt-000", "rt-040", "rt-080"] {
            assert_eq!(store.stage_of(faulty), None);
            assert_eq!(store.records[faulty].days_remaining, None);
        }
        assert_eq!(store.commits, 2);

        let mut checked = 0;
        for record in store.records.values().filter(|r| r.days_remaining.is_some()) {
            let (start, end) = (record.license_start.unwrap(), record.license_end.unwrap());
            let expected = classify(date(2025, 6, 1), start, end).unwrap();
            assert_eq!(record.renewal_stage, Some(expected.stage), "{}", record.id);
            assert_eq!(record.days_remaining, Some(expected.days_remaining), "{}", record.id);
            checked += 1;
        }
        assert_eq!(checked, 97);
        // rt-001 ends 2025-07-23; rt-099 ends 2026-05-13
        assert_eq!(store.stage_of("rt-001"), Some(RenewalStage::SixtyDaysToExpiry));
        assert_eq!(store.stage_of("rt-099"), Some(RenewalStage::Running));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let mut store = hundred_with_three_faulty();
        let clock = FixedClock(date(2025, 6, 1));

        let first = run_sweep(&mut store, &clock, 50).await.unwrap();
        assert!(!first.transitions.is_empty());

        let second = run_sweep(&mut store, &clock, 50).await.unwrap();
        assert!(second.transitions.is_empty());
        assert_eq!(second.success, 97);
        assert_eq!(second.failed, 3);
    }

    #[tokio::test]
    async fn test_transitions_record_old_and_new_stage() {
        let mut store = MemoryStore::default();
        let mut record = submitted("rt-1", date(2025, 1, 1), date(2025, 12, 31));
        record.renewal_stage = Some(RenewalStage::Running);
        store.add(record);
        store.add(submitted("rt-2", date(2025, 1, 1), date(2025, 12, 31)));

        let report = run_sweep(&mut store, &FixedClock(date(2025, 10, 15)), 50)
            .await
            .unwrap();

        assert_eq!(
            report.transitions,
            vec![
                StageTransition {
                    record_id: "rt-1".into(),
                    previous: Some(RenewalStage::Running),
                    current: Some(RenewalStage::NinetyDaysToExpiry),
                    days_remaining: Some(77),
                },
                StageTransition {
                    record_id: "rt-2".into(),
                    previous: None,
                    current: Some(RenewalStage::NinetyDaysToExpiry),
                    days_remaining: Some(77),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_days_only_change_is_not_a_transition() {
        let mut store = MemoryStore::default();
        let mut record = submitted("rt-1", date(2025, 1, 1), date(2025, 12, 31));
        record.renewal_stage = Some(RenewalStage::Running);
        record.days_remaining = Some(300);
        store.add(record);

        let report = run_sweep(&mut store, &FixedClock(date(2025, 3, 1)), 50)
            .await
            .unwrap();
        assert!(report.transitions.is_empty());
        assert_eq!(store.records["rt-1"].days_remaining, Some(305));
    }

    #[tokio::test]
    async fn test_write_failure_is_counted_not_fatal() {
        let mut store = MemoryStore::default();
        for id in ["rt-a", "rt-b", "rt-c"] {
            store.add(submitted(id, date(2025, 1, 1), date(2025, 12, 31)));
        }
        store.failing_writes.insert("rt-b".into());

        let report = run_sweep(&mut store, &FixedClock(date(2025, 6, 1)), 50)
            .await
            .unwrap();

        assert_eq!((report.total, report.success, report.failed), (3, 2, 1));
        assert_eq!(store.stage_of("rt-a"), Some(RenewalStage::Running));
        assert_eq!(store.stage_of("rt-b"), None);
        assert_eq!(store.stage_of("rt-c"), Some(RenewalStage::Running));
    }

    #[tokio::test]
    async fn test_non_candidates_are_skipped() {
        let mut store = MemoryStore::default();
        store.add(RenewalRecord::new("draft", Utc::now()).with_license(date(2025, 1, 1), date(2025, 2, 1)));
        let mut cancelled = submitted("cancelled", date(2025, 1, 1), date(2025, 2, 1));
        cancelled.status = DocStatus::Cancelled;
        store.add(cancelled);

        let report = run_sweep(&mut store, &FixedClock(date(2025, 6, 1)), 50)
            .await
            .unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(store.commits, 0);
        assert_eq!(store.stage_of("draft"), None);
    }

    #[tokio::test]
    async fn test_commit_batches() {
        let mut store = MemoryStore::default();
        for n in 0..101 {
            store.add(submitted(&format!("rt-{:03}", n), date(2025, 1, 1), date(2025, 12, 31)));
        }
        run_sweep(&mut store, &FixedClock(date(2025, 6, 1)), 50).await.unwrap();
        assert_eq!(store.commits, 3);
    }

    #[tokio::test]
    async fn test_sweep_against_sqlite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.renewals();

        let mut stale = submitted("rt-1", date(2025, 1, 1), date(2025, 12, 31));
        stale.renewal_stage = Some(RenewalStage::Running);
        stale.days_remaining = Some(200);
        repo.insert(&stale).await.unwrap();
        repo.insert(&submitted("rt-2", date(2025, 6, 1), date(2025, 3, 1))).await.unwrap();

        let before = repo.require("rt-1").await.unwrap();

        let mut store = SqliteRecordStore::new(db.pool().clone());
        let report = run_sweep(&mut store, &FixedClock(date(2026, 1, 5)), 1)
            .await
            .unwrap();
        drop(store);

        assert_eq!((report.total, report.success, report.failed), (2, 1, 1));

        let after = repo.require("rt-1").await.unwrap();
        assert_eq!(after.renewal_stage, Some(RenewalStage::Expired));
        assert_eq!(after.days_remaining, Some(-5));
        assert_eq!(after.modified_at, before.modified_at);
        assert_eq!(after.status, DocStatus::Submitted);

        let faulty = repo.require("rt-2").await.unwrap();
        assert_eq!(faulty.renewal_stage, None);
    }

    #[test]
    fn test_report_serializes() {
        let report = SweepReport::new(date(2025, 6, 1), 0);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["run_date"], "2025-06-01");
    }
}
