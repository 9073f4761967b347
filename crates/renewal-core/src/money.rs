//! # Money Module
//!
//! Rounding rules for monetary values and exchange rates.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    round(2.675, 2) = 2.67           ❌ (2.675 is really 2.67499...)     │
//! │                                                                         │
//! │  Renewal records carry fractional quantities, unit rates and exchange   │
//! │  rates (1.5, 12.3456), so integer cents are not enough either.          │
//! │                                                                         │
//! │  OUR SOLUTION: base-10 `rust_decimal::Decimal`                          │
//! │    2.675 is stored exactly, rounding to 2dp is exact                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Mode
//! Every "round to 2 decimals" in the system uses Bankers Rounding
//! (round half to even): `0.125 → 0.12`, `0.135 → 0.14`.
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use renewal_core::money::round_money;
//!
//! let amount = Decimal::new(12345, 3); // 12.345
//! assert_eq!(round_money(amount), Decimal::new(1234, 2)); // 12.34
//! ```

use rust_decimal::{Decimal, RoundingStrategy};

use crate::MONEY_PRECISION;

/// Rounds a value to [`MONEY_PRECISION`] places using Bankers Rounding.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_PRECISION, RoundingStrategy::MidpointNearestEven)
}

/// Sums values after rounding each term to 2 decimals.
///
/// ## Per-Term Rounding
/// ```text
/// terms:      0.005   0.005   0.005
/// per-term:   0.00  + 0.00  + 0.00   = 0.00   ← THIS FUNCTION
/// final-sum:  round(0.015)           = 0.02   (NOT what we do)
/// ```
pub fn sum_rounded<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .map(round_money)
        .fold(Decimal::ZERO, |acc, v| acc + v)
}

/// Returns the rate the calculator multiplies by.
///
/// An unresolved or zero rate falls back to `1`. The save path never gets
/// here with an unresolvable pair: the resolver has already failed.
#[inline]
pub fn effective_exchange_rate(rate: Option<Decimal>) -> Decimal {
    match rate {
        Some(r) if !r.is_zero() => r,
        _ => Decimal::ONE,
    }
}

/// Returns true if `rate` can be used as a manual override.
#[inline]
pub fn is_usable_rate(rate: Option<Decimal>) -> bool {
    matches!(rate, Some(r) if r > Decimal::ZERO)
}

// =============================================================================
// Unit Tests
// =============================================================================
