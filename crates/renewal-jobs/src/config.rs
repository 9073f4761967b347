//! # Renewal Configuration
//!
//! Configuration for the database location and the daily sweep.
//!
//! ## Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where a setting comes from                           │
//! │                                                                         │
//! │  1. RENEWAL_* environment variables (win)                              │
//! │     RENEWAL_DATABASE_PATH=/srv/renewals.db                             │
//! │     RENEWAL_COMMIT_EVERY=100                                           │
//! │     RENEWAL_RUN_AT=03:30                                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/renewal-tracker/renewal.toml (Linux)                     │
//! │     ~/Library/Application Support/com.renewal.renewal-tracker/...      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     commit every 50 records, run at 02:00                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## File Format
//! ```toml
//! # renewal.toml
//! [database]
//! path = "/srv/renewals.db"
//! max_connections = 5
//!
//! [sweep]
//! commit_every = 50
//! run_at = "02:00"
//! ```

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{JobError, JobResult};
use renewal_db::DbConfig;

const RUN_AT_FORMAT: &str = "%H:%M";

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; created on first use.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "renewal", "renewal-tracker")
        .map(|dirs| dirs.data_dir().join("renewals.db"))
        .unwrap_or_else(|| PathBuf::from("renewals.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Sweep Settings
// =============================================================================

/// `[sweep]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Records processed between commits.
    #[serde(default = "default_commit_every")]
    pub commit_every: usize,

    /// Local wall-clock time of the daily run, "HH:MM".
    #[serde(default = "default_run_at")]
    pub run_at: String,
}

fn default_commit_every() -> usize {
    50
}

fn default_run_at() -> String {
    "02:00".to_string()
}

impl Default for SweepSettings {
    fn default() -> Self {
        SweepSettings {
            commit_every: default_commit_every(),
            run_at: default_run_at(),
        }
    }
}

impl SweepSettings {
    /// Parses `run_at`.
    pub fn run_at_time(&self) -> JobResult<NaiveTime> {
        NaiveTime::parse_from_str(&self.run_at, RUN_AT_FORMAT).map_err(|e| {
            JobError::InvalidConfig(format!(
                "run_at must be HH:MM, got '{}': {}",
                self.run_at, e
            ))
        })
    }
}

// =============================================================================
// Renewal Config
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenewalConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sweep: SweepSettings,
}

impl RenewalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the effective configuration and validates it.
    ///
    /// `config_path` falls back to [`Self::default_config_path`]; a missing
    /// file means defaults. `RENEWAL_*` variables win over both.
    pub fn load(config_path: Option<PathBuf>) -> JobResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading renewal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Rejects settings the sweep or pool cannot run with.
    pub fn validate(&self) -> JobResult<()> {
        if self.sweep.commit_every == 0 {
            return Err(JobError::InvalidConfig(
                "commit_every must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(JobError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        self.sweep.run_at_time()?;
        Ok(())
    }

    /// Applies overrides from a variable source (the process environment
    /// in production).
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("RENEWAL_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = var("RENEWAL_COMMIT_EVERY") {
            match value.parse::<usize>() {
                Ok(n) => self.sweep.commit_every = n,
                Err(_) => warn!(value = %value, "Ignoring non-numeric RENEWAL_COMMIT_EVERY"),
            }
        }

        if let Some(run_at) = var("RENEWAL_RUN_AT") {
            debug!(run_at = %run_at, "Overriding sweep time from environment");
            self.sweep.run_at = run_at;
        }
    }

    /// `renewal.toml` in the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "renewal", "renewal-tracker")
            .map(|dirs| dirs.config_dir().join("renewal.toml"))
    }

    /// Database settings as a pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RenewalConfig::default();
        assert_eq!(config.sweep.commit_every, 50);
        assert_eq!(config.sweep.run_at_time().unwrap(), NaiveTime::from_hms_opt(2, 0, 0).unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RenewalConfig::default();

        config.sweep.commit_every = 0;
        assert!(config.validate().is_err());

        config.sweep.commit_every = 10;
        config.sweep.run_at = "25:00".into();
        assert!(config.validate().is_err());

        config.sweep.run_at = "2am".into();
        assert!(config.validate().is_err());

        config.sweep.run_at = "23:59".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RenewalConfig = toml::from_str(
            r#"
            [sweep]
            run_at = "04:15"
            "#,
        )
        .unwrap();

        assert_eq!(config.sweep.run_at, "04:15");
        assert_eq!(config.sweep.commit_every, 50);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RENEWAL_DATABASE_PATH", "/tmp/override.db"),
            ("RENEWAL_COMMIT_EVERY", "7"),
            ("RENEWAL_RUN_AT", "05:30"),
        ]);

        let mut config = RenewalConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.sweep.commit_every, 7);
        assert_eq!(config.sweep.run_at, "05:30");
    }

    #[test]
    fn test_bad_numeric_override_is_ignored() {
        let mut config = RenewalConfig::default();
        config.apply_overrides(|key| (key == "RENEWAL_COMMIT_EVERY").then(|| "lots".to_string()));
        assert_eq!(config.sweep.commit_every, 50);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&RenewalConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[sweep]"));
        assert!(toml_str.contains("run_at = \"02:00\""));
    }

    #[test]
    fn test_db_config() {
        let mut config = RenewalConfig::default();
        config.database.path = PathBuf::from("/tmp/x.db");
        config.database.max_connections = 3;
        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(db.max_connections, 3);
    }
}
