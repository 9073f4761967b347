//! # Domain Types
//!
//! Core domain types used throughout the Renewal Tracker.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌─────────────────────┐               │
//! │  │    RenewalRecord     │ 1    * │      LineItem       │               │
//! │  │  ──────────────────  │───────►│  ─────────────────  │               │
//! │  │  id (UUID)           │        │  qty, rate          │               │
//! │  │  company, currency   │        │  amount             │               │
//! │  │  exchange_rate       │        │  base_rate          │               │
//! │  │  license_start/end   │        │  base_amount        │               │
//! │  │  net_total(_base)    │        └─────────────────────┘               │
//! │  │  renewal_stage       │                                               │
//! │  │  days_remaining      │        ┌─────────────────────┐               │
//! │  │  status              │        │  StageTransition    │               │
//! │  └──────────────────────┘        │  (sweep output)     │               │
//! │                                  └─────────────────────┘               │
//! │  ┌──────────────────────┐        ┌─────────────────────┐               │
//! │  │    RenewalStage      │        │     DocStatus       │               │
//! │  │  Open → Running →    │        │  Draft              │               │
//! │  │  90 → 60 → 30 Days → │        │  Submitted          │               │
//! │  │  Expired             │        │  Cancelled          │               │
//! │  └──────────────────────┘        └─────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Renewal Stage
// =============================================================================

/// How close a license is to its renewal date.
///
/// The string labels are the stored and displayed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
pub enum RenewalStage {
    /// License has not started yet.
    #[serde(rename = "Open")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Open"))]
    Open,
    /// License is active and more than 90 days from its end.
    #[serde(rename = "Running")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Running"))]
    Running,
    #[serde(rename = "90 Days to Expiry")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "90 Days to Expiry"))]
    NinetyDaysToExpiry,
    #[serde(rename = "60 Days to Expiry")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "60 Days to Expiry"))]
    SixtyDaysToExpiry,
    #[serde(rename = "30 Days to Expiry")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "30 Days to Expiry"))]
    ThirtyDaysToExpiry,
    /// End date reached or passed.
    #[serde(rename = "Expired")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Expired"))]
    Expired,
}

impl RenewalStage {
    /// Every stage, in chronological order over a license's lifetime.
    pub const ALL: [RenewalStage; 6] = [
        RenewalStage::Open,
        RenewalStage::Running,
        RenewalStage::NinetyDaysToExpiry,
        RenewalStage::SixtyDaysToExpiry,
        RenewalStage::ThirtyDaysToExpiry,
        RenewalStage::Expired,
    ];

    /// Returns the stored/display label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RenewalStage::Open => "Open",
            RenewalStage::Running => "Running",
            RenewalStage::NinetyDaysToExpiry => "90 Days to Expiry",
            RenewalStage::SixtyDaysToExpiry => "60 Days to Expiry",
            RenewalStage::ThirtyDaysToExpiry => "30 Days to Expiry",
            RenewalStage::Expired => "Expired",
        }
    }
}

impl fmt::Display for RenewalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenewalStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RenewalStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "renewal_stage".to_string(),
                allowed: RenewalStage::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

/// Displays an optional stage the way logs and messages show it.
pub fn stage_label(stage: Option<RenewalStage>) -> &'static str {
    stage.map(|s| s.as_str()).unwrap_or("None")
}

// =============================================================================
// Document Status
// =============================================================================

/// Lifecycle status of a renewal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    /// Editable; every save recomputes all derived fields.
    #[default]
    Draft,
    /// Finalized; only submit, manual re-classify and the sweep touch it.
    Submitted,
    /// Withdrawn; ignored by the sweep.
    Cancelled,
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocStatus::Draft => write!(f, "draft"),
            DocStatus::Submitted => write!(f, "submitted"),
            DocStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A licensed product line on a renewal record.
///
/// `amount`, `base_rate` and `base_amount` are derived; see
/// [`crate::calculator::compute_lines`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineItem {
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub item_group: Option<String>,
    pub uom: Option<String>,
    /// Quantity (may be fractional, e.g. seat-months).
    pub qty: Decimal,
    /// Unit rate in the transaction currency.
    pub rate: Decimal,
    /// qty × rate, transaction currency.
    pub amount: Decimal,
    /// Unit rate in the company's base currency.
    pub base_rate: Decimal,
    /// Amount in the company's base currency.
    pub base_amount: Decimal,
}

impl LineItem {
    /// Creates an item with quantity and rate; derived fields start at zero.
    pub fn new(qty: Decimal, rate: Decimal) -> Self {
        LineItem {
            qty,
            rate,
            ..Default::default()
        }
    }

    /// Sets the item code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.item_code = Some(code.into());
        self
    }
}

// =============================================================================
// Renewal Record
// =============================================================================

/// A license/contract renewal tracking record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalRecord {
    /// Document name, e.g. "RT-2025-00017" or a UUID.
    pub id: String,

    /// Owning company; its default currency is the base currency.
    pub company: Option<String>,

    /// Transaction currency code (ISO 4217, e.g. "USD").
    pub currency: Option<String>,

    /// Transaction → base currency rate. `None` until resolved.
    pub exchange_rate: Option<Decimal>,

    pub license_start: Option<NaiveDate>,
    pub license_end: Option<NaiveDate>,

    /// Ordered line items.
    pub items: Vec<LineItem>,

    /// Sum of item amounts (transaction currency).
    pub net_total: Decimal,

    /// Sum of item base amounts (base currency).
    pub net_total_base: Decimal,

    pub renewal_stage: Option<RenewalStage>,

    /// Signed days until license end; negative once expired.
    pub days_remaining: Option<i64>,

    pub status: DocStatus,

    pub created_at: DateTime<Utc>,

    /// Last user edit. Out-of-band stage updates leave this untouched.
    pub modified_at: DateTime<Utc>,
}

impl RenewalRecord {
    /// Creates an empty draft record.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        RenewalRecord {
            id: id.into(),
            company: None,
            currency: None,
            exchange_rate: None,
            license_start: None,
            license_end: None,
            items: Vec::new(),
            net_total: Decimal::ZERO,
            net_total_base: Decimal::ZERO,
            renewal_stage: None,
            days_remaining: None,
            status: DocStatus::Draft,
            created_at,
            modified_at: created_at,
        }
    }

    /// Sets the license period.
    pub fn with_license(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.license_start = Some(start);
        self.license_end = Some(end);
        self
    }

    /// Sets company and transaction currency.
    pub fn with_currency(mut self, company: impl Into<String>, currency: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self.currency = Some(currency.into());
        self
    }

    /// Appends a line item.
    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    /// Returns true if both license dates are set.
    pub fn has_license_period(&self) -> bool {
        self.license_start.is_some() && self.license_end.is_some()
    }

    /// Returns true if the batch sweep should visit this record.
    pub fn is_sweep_candidate(&self) -> bool {
        self.status == DocStatus::Submitted && self.has_license_period()
    }

    /// Clears both stage fields.
    pub fn clear_stage(&mut self) {
        self.renewal_stage = None;
        self.days_remaining = None;
    }
}

// =============================================================================
// Stage Transition
// =============================================================================

/// A stage change detected by a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub record_id: String,
    pub previous: Option<RenewalStage>,
    pub current: Option<RenewalStage>,
    pub days_remaining: Option<i64>,
}

impl fmt::Display for StageTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.record_id,
            stage_label(self.previous),
            stage_label(self.current)
        )?;
        if let Some(days) = self.days_remaining {
            write!(f, " ({} days)", days)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
