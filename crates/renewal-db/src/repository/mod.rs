//! # Repository Module
//!
//! Database repository implementations for the renewal tracker.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DocumentService / sweep / CLI                                         │
//! │       │                                                                 │
//! │       │  db.renewals().get("rt-1")                                     │
//! │       ▼                                                                 │
//! │  RenewalRepository                                                     │
//! │  ├── insert / update / get                                             │
//! │  ├── sweep_candidates                                                  │
//! │  └── update_stage   (no modified_at bump)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CompanyRepository`](company::CompanyRepository) - Company base currencies
//! - [`ExchangeRateRepository`](exchange_rate::ExchangeRateRepository) - Rate table
//! - [`RenewalRepository`](renewal::RenewalRepository) - Records and line items
//! - [`PermissionRepository`](permission::PermissionRepository) - User grants

pub mod company;
pub mod exchange_rate;
pub mod permission;
pub mod renewal;

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{DbError, DbResult};

/// Parses a money/rate column stored as TEXT.
pub(crate) fn parse_decimal(column: &str, value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|e| DbError::invalid_data(column, value, e))
}

pub(crate) fn parse_optional_decimal(column: &str, value: Option<&str>) -> DbResult<Option<Decimal>> {
    value.map(|v| parse_decimal(column, v)).transpose()
}
