//! # Daily Scheduler
//!
//! Runs the batch sweep once a day at a configured local time.
//!
//! ## Scheduler Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DailyScheduler::start() ──► spawned task, returns SchedulerHandle     │
//! │                                                                         │
//! │  loop {                                                                │
//! │      delay = delay_until(now, run_at)                                  │
//! │      select! {                                                         │
//! │          sleep(delay)        → run_sweep, log summary                  │
//! │          RunNow(reply)       → run_sweep, send report back             │
//! │          Shutdown / closed   → break                                   │
//! │      }                                                                 │
//! │  }                                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A sweep that fails as a whole is logged and retried at the next run;
//! the scheduler keeps going.
//!
//! `run_at` is wall-clock time. On a day the clocks skip it the run happens
//! an hour later; on a day it occurs twice the run happens at the first.

use chrono::{DateTime, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::clock::SystemClock;
use crate::error::{JobError, JobResult};
use crate::store::SqliteRecordStore;
use crate::sweep::{run_sweep, SweepReport};
use renewal_core::Clock;
use renewal_db::Database;

/// Time left until the next `run_at` strictly after `now`, in `now`'s
/// time zone.
///
/// ## Example
/// ```
/// use chrono::{FixedOffset, NaiveTime, TimeZone};
/// use renewal_jobs::scheduler::delay_until;
///
/// let tz = FixedOffset::east_opt(3600).unwrap();
/// let now = tz.with_ymd_and_hms(2025, 3, 1, 23, 0, 0).unwrap();
/// let run_at = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
/// assert_eq!(delay_until(&now, run_at).as_secs(), 3 * 3600);
/// ```
pub fn delay_until<Tz: TimeZone>(now: &DateTime<Tz>, run_at: NaiveTime) -> Duration {
    let tz = now.timezone();
    let mut day = now.date_naive();

    for _ in 0..3 {
        if let Some(next) = wall_clock_instant(&tz, day.and_time(run_at)) {
            if next > *now {
                return next
                    .signed_duration_since(now)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
            }
        }
        match day.succ_opt() {
            Some(next_day) => day = next_day,
            None => break,
        }
    }
    Duration::from_secs(24 * 3600)
}

fn wall_clock_instant<Tz: TimeZone>(tz: &Tz, at: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&at) {
        LocalResult::Single(instant) => Some(instant),
        LocalResult::Ambiguous(first, _) => Some(first),
        // skipped by a clock change
        LocalResult::None => tz
            .from_local_datetime(&(at + chrono::Duration::hours(1)))
            .earliest(),
    }
}

/// Commands accepted by a running scheduler.
enum SchedulerCommand {
    RunNow(oneshot::Sender<JobResult<SweepReport>>),
    Shutdown,
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    cmd_tx: mpsc::Sender<SchedulerCommand>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Runs a sweep immediately and waits for its report.
    pub async fn run_now(&self) -> JobResult<SweepReport> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(SchedulerCommand::RunNow(reply_tx))
            .await
            .map_err(|_| JobError::ChannelError("Scheduler channel closed".into()))?;
        reply_rx
            .await
            .map_err(|_| JobError::ChannelError("Scheduler dropped the sweep reply".into()))?
    }

    /// Stops the scheduler, waiting for a sweep in progress to finish.
    pub async fn shutdown(self) -> JobResult<()> {
        // Already stopped if the send fails
        let _ = self.cmd_tx.send(SchedulerCommand::Shutdown).await;
        self.task
            .await
            .map_err(|e| JobError::ChannelError(format!("Scheduler task failed: {}", e)))
    }
}

/// Daily driver for [`run_sweep`].
pub struct DailyScheduler<C = SystemClock> {
    db: Database,
    run_at: NaiveTime,
    commit_every: usize,
    clock: C,
}

impl DailyScheduler<SystemClock> {
    pub fn new(db: Database, run_at: NaiveTime, commit_every: usize) -> Self {
        DailyScheduler {
            db,
            run_at,
            commit_every,
            clock: SystemClock,
        }
    }
}

impl<C> DailyScheduler<C> {
    /// Uses `clock` for the classification date. The timer still follows
    /// the local wall clock.
    pub fn with_clock<D: Clock>(self, clock: D) -> DailyScheduler<D> {
        DailyScheduler {
            db: self.db,
            run_at: self.run_at,
            commit_every: self.commit_every,
            clock,
        }
    }
}

impl<C: Clock + Send + Sync + 'static> DailyScheduler<C> {
    /// Starts the scheduler on the current runtime.
    pub fn start(self) -> SchedulerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            self.run(cmd_rx).await;
        });
        SchedulerHandle { cmd_tx, task }
    }

    async fn run(self, mut cmd_rx: mpsc::Receiver<SchedulerCommand>) {
        info!(run_at = %self.run_at, commit_every = self.commit_every, "Renewal scheduler started");

        loop {
            let delay = delay_until(&chrono::Local::now(), self.run_at);
            info!(next_run_in_secs = delay.as_secs(), "Next renewal stage sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    match self.sweep().await {
                        Ok(report) => report.log_summary(),
                        Err(e) => error!(error = %e, "Scheduled renewal stage sweep failed"),
                    }
                }
                cmd = cmd_rx.recv() => match cmd {
                    Some(SchedulerCommand::RunNow(reply)) => {
                        let result = self.sweep().await;
                        if let Ok(report) = &result {
                            report.log_summary();
                        }
                        let _ = reply.send(result);
                    }
                    Some(SchedulerCommand::Shutdown) | None => {
                        info!("Renewal scheduler shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn sweep(&self) -> JobResult<SweepReport> {
        let mut store = SqliteRecordStore::new(self.db.pool().clone());
        run_sweep(&mut store, &self.clock, self.commit_every).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};
    use renewal_core::{DocStatus, FixedClock, RenewalRecord, RenewalStage};
    use renewal_db::DbConfig;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    /// +01:00, moving to +02:00 at 02:00 local on 2025-03-30.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(7200).unwrap()
        }

        fn change_day() -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 3, 30).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::change_day().and_time(time(2, 0));
            let gap_end = Self::change_day().and_time(time(3, 0));
            if *local < gap_start {
                LocalResult::Single(Self::winter())
            } else if *local < gap_end {
                LocalResult::None
            } else {
                LocalResult::Single(Self::summer())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::change_day().and_time(time(1, 0)) {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_delay_later_today() {
        assert_eq!(delay_until(&at(1, 30), time(2, 0)), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_delay_rolls_to_tomorrow() {
        assert_eq!(delay_until(&at(2, 0), time(2, 0)), Duration::from_secs(24 * 3600));
        assert_eq!(delay_until(&at(2, 1), time(2, 0)), Duration::from_secs(24 * 3600 - 60));
    }

    #[test]
    fn test_delay_follows_clock_change() {
        // the night the clocks go forward is an hour short
        let now = SpringForward.with_ymd_and_hms(2025, 3, 29, 4, 0, 0).unwrap();
        assert_eq!(delay_until(&now, time(4, 0)), Duration::from_secs(23 * 3600));

        // 02:30 does not exist on the change day; the run moves to 03:30
        let now = SpringForward.with_ymd_and_hms(2025, 3, 29, 2, 30, 0).unwrap();
        assert_eq!(delay_until(&now, time(2, 30)), Duration::from_secs(24 * 3600));
    }

    #[tokio::test]
    async fn test_shutdown_before_first_run() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let handle = DailyScheduler::new(db, time(2, 0), 50).start();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_now_returns_report() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut record = RenewalRecord::new("rt-1", Utc::now()).with_license(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
        record.status = DocStatus::Submitted;
        db.renewals().insert(&record).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let handle = DailyScheduler::new(db.clone(), time(2, 0), 50)
            .with_clock(FixedClock(today))
            .start();

        let report = handle.run_now().await.unwrap();
        assert_eq!(report.run_date, today);
        assert_eq!((report.total, report.success, report.failed), (1, 1, 0));
        assert_eq!(report.transitions.len(), 1);

        handle.shutdown().await.unwrap();

        let stored = db.renewals().require("rt-1").await.unwrap();
        assert_eq!(stored.renewal_stage, Some(RenewalStage::Expired));
        assert_eq!(stored.days_remaining, Some(-5));
    }
}
