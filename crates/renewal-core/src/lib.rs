//! # renewal-core: Pure Business Logic for the Renewal Tracker
//!
//! This crate holds every domain rule of the renewal tracker as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Renewal Tracker Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    renewal CLI / daily daemon                   │   │
//! │  │      classify, sweep, reclassify, rate set, daemon              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          renewal-jobs (DocumentService, sweep, scheduler)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ renewal-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌────────────────┐  │   │
//! │  │   │ currency │ │ calculator │ │  stage   │ │   document     │  │   │
//! │  │   │ resolve  │ │ lines      │ │ classify │ │ save pipeline  │  │   │
//! │  │   │ RateTable│ │ totals     │ │ rules    │ │ submit         │  │   │
//! │  │   └──────────┘ └────────────┘ └──────────┘ └────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO SYSTEM CLOCK • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 renewal-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (RenewalRecord, LineItem, RenewalStage, ...)
//! - [`money`] - 2dp Bankers Rounding and exchange-rate fallbacks
//! - [`currency`] - Exchange-rate resolution
//! - [`calculator`] - Line amounts and document totals
//! - [`stage`] - Renewal stage classification
//! - [`clock`] - Injectable source of "today"
//! - [`document`] - Save / submit pipeline over a record
//! - [`validation`] - License date validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use renewal_core::stage::classify;
//! use renewal_core::RenewalStage;
//!
//! let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
//! let today = NaiveDate::from_ymd_opt(2025, 10, 15).unwrap();
//!
//! let result = classify(today, start, end).unwrap();
//! assert_eq!(result.stage, RenewalStage::NinetyDaysToExpiry);
//! assert_eq!(result.days_remaining, 77);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculator;
pub mod clock;
pub mod currency;
pub mod document;
pub mod error;
pub mod money;
pub mod stage;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use clock::{Clock, FixedClock};
pub use currency::{RateLookup, RateTable};
pub use error::{CoreError, CoreResult, ValidationError};
pub use stage::Classification;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Decimal places every monetary value is rounded to.
pub const MONEY_PRECISION: u32 = 2;

/// Days before license end at which the 90-day window opens.
pub const NINETY_DAY_WINDOW: u64 = 90;

/// Days before license end at which the 60-day window opens.
pub const SIXTY_DAY_WINDOW: u64 = 60;

/// Days before license end at which the 30-day window opens.
pub const THIRTY_DAY_WINDOW: u64 = 30;
