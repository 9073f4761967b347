//! # renewal
//!
//! Command line front end for the renewal tracker.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  classify   pure classification of a license period (no database)      │
//! │  sweep      one batch sweep now, JSON report on stdout                 │
//! │  reclassify manual re-classification of one record                     │
//! │  daemon     daily scheduler until Ctrl+C                               │
//! │  rate set   maintain the exchange-rate table                           │
//! │  seed       demo companies, rates and submitted records                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from `--config` (or the platform config dir) with
//! `RENEWAL_*` environment overrides. Logging follows `RUST_LOG`.

mod seed;

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use renewal_core::stage::classify;
use renewal_core::validation::parse_currency_code;
use renewal_core::Clock;
use renewal_db::Database;
use renewal_jobs::{
    run_sweep, DailyScheduler, DocumentService, RenewalConfig, SqliteRecordStore, SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "renewal", version, about = "License renewal tracking")]
struct Cli {
    /// Path to renewal.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a license period without touching the database
    Classify {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Run one sweep over all submitted records
    Sweep,

    /// Re-classify one record on behalf of a user
    Reclassify {
        id: String,
        #[arg(long)]
        user: String,
    },

    /// Run the sweep every day at the configured time
    Daemon,

    /// Exchange-rate maintenance
    Rate {
        #[command(subcommand)]
        action: RateCommand,
    },

    /// Fill an empty database with demo records
    Seed {
        #[arg(long, short, default_value_t = 200)]
        count: usize,
    },
}

#[derive(Subcommand, Debug)]
enum RateCommand {
    /// Set the rate converting FROM into TO
    Set { from: String, to: String, rate: Decimal },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { start, end, today } => {
            let today = today.unwrap_or_else(|| SystemClock.today());
            let result = classify(today, start, end)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Sweep => {
            let config = RenewalConfig::load(cli.config)?;
            let db = open_database(&config).await?;

            let mut store = SqliteRecordStore::new(db.pool().clone());
            let report = run_sweep(&mut store, &SystemClock, config.sweep.commit_every).await?;
            drop(store);
            report.log_summary();
            println!("{}", serde_json::to_string_pretty(&report)?);

            db.close().await;
        }

        Command::Reclassify { id, user } => {
            let config = RenewalConfig::load(cli.config)?;
            let db = open_database(&config).await?;

            let outcome = DocumentService::new(db.clone()).reclassify(&id, &user).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            db.close().await;

            if !outcome.is_success() {
                bail!("re-classification of {} did not succeed", id);
            }
        }

        Command::Daemon => {
            let config = RenewalConfig::load(cli.config)?;
            let db = open_database(&config).await?;

            let handle =
                DailyScheduler::new(db.clone(), config.sweep.run_at_time()?, config.sweep.commit_every)
                    .start();

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl+C")?;
            info!("Shutdown requested");

            handle.shutdown().await?;
            db.close().await;
        }

        Command::Rate {
            action: RateCommand::Set { from, to, rate },
        } => {
            let from = parse_currency_code(&from)?;
            let to = parse_currency_code(&to)?;
            if rate <= Decimal::ZERO {
                bail!("exchange rate must be positive, got {}", rate);
            }

            let config = RenewalConfig::load(cli.config)?;
            let db = open_database(&config).await?;
            db.exchange_rates().upsert(&from, &to, rate).await?;
            println!("{} → {} = {}", from, to, rate);
            db.close().await;
        }

        Command::Seed { count } => {
            let config = RenewalConfig::load(cli.config)?;
            let db = open_database(&config).await?;

            let inserted = seed::seed(&db, count, SystemClock.today()).await?;
            println!("Inserted {} records into {}", inserted, config.database.path.display());
            for (stage, n) in seed::stage_counts(&db).await? {
                println!("  {:<18} {}", stage.as_str(), n);
            }
            db.close().await;
        }
    }

    Ok(())
}

/// Installs the `tracing` subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Per-record classification details
/// - Default: INFO, with sqlx at WARN
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_database(config: &RenewalConfig) -> anyhow::Result<Database> {
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    Database::new(config.db_config())
        .await
        .with_context(|| format!("failed to open {}", config.database.path.display()))
}
