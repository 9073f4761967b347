//! # renewal-db: Database Layer for the Renewal Tracker
//!
//! SQLite storage for renewal records, companies, exchange rates and
//! user permissions, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Renewal Tracker Data Flow                           │
//! │                                                                         │
//! │  DocumentService.save / daily sweep                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   renewal-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ CompanyRepo    │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ExchangeRateRepo│  │ 001_initial  │  │   │
//! │  │   │               │    │ RenewalRepo    │   │   _schema    │  │   │
//! │  │   │               │    │ PermissionRepo │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (path from renewal.toml)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use renewal_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("renewals.db")).await?;
//! let base = db.companies().default_currency("Acme Ghana").await?;
//! let rates = db.exchange_rates().load_table().await?;
//! let record = db.renewals().require("rt-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{begin_write, Database, DbConfig};

pub use repository::company::CompanyRepository;
pub use repository::exchange_rate::ExchangeRateRepository;
pub use repository::permission::{PermissionRepository, WRITE_ACTION};
pub use repository::renewal::RenewalRepository;
