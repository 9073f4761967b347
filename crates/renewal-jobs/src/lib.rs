//! # renewal-jobs: Services and Background Jobs for the Renewal Tracker
//!
//! Joins the pure rules of `renewal-core` to the storage of `renewal-db`.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          renewal-jobs                                   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌────────────────────┐  │
//! │  │ DocumentService  │   │  DailyScheduler  │   │   RenewalConfig    │  │
//! │  │                  │   │                  │   │                    │  │
//! │  │ save / submit    │   │ sleep → sweep    │   │ renewal.toml + env │  │
//! │  │ reclassify       │   │ run_now/shutdown │   │                    │  │
//! │  └────────┬─────────┘   └────────┬─────────┘   └────────────────────┘  │
//! │           │                      │                                      │
//! │           │                      ▼                                      │
//! │           │             ┌──────────────────┐                            │
//! │           │             │    run_sweep     │◄── RecordStore (trait)     │
//! │           │             │   SweepReport    │    SqliteRecordStore       │
//! │           │             └────────┬─────────┘                            │
//! │           ▼                      ▼                                      │
//! │      renewal-core          renewal-db                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use renewal_jobs::{DailyScheduler, RenewalConfig};
//!
//! let config = RenewalConfig::load(None)?;
//! let db = renewal_db::Database::new(config.db_config()).await?;
//! let handle = DailyScheduler::new(db, config.sweep.run_at_time()?, config.sweep.commit_every).start();
//! let report = handle.run_now().await?;
//! report.log_summary();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod sweep;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::SystemClock;
pub use config::{DatabaseSettings, RenewalConfig, SweepSettings};
pub use document::{DocumentService, PermissionCheck, ReclassifyOutcome};
pub use error::{JobError, JobResult};
pub use scheduler::{DailyScheduler, SchedulerHandle};
pub use store::{RecordStore, SqliteRecordStore};
pub use sweep::{run_sweep, SweepReport};
