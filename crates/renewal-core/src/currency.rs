//! # Currency Resolution
//!
//! Decides which exchange rate a record uses to convert its transaction
//! currency into the owning company's base currency.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(currency, base_currency, existing_rate, lookup)               │
//! │       │                                                                 │
//! │       ├── base or transaction currency unknown? → existing_rate (no-op)│
//! │       │                                                                 │
//! │       ├── currency == base?      → 1   (stored rate ignored)           │
//! │       │                                                                 │
//! │       ├── existing_rate > 0?     → existing_rate (manual override)     │
//! │       │                                                                 │
//! │       ├── lookup(currency, base) → found rate                          │
//! │       │                                                                 │
//! │       └── not found              → ExchangeRateUnavailable             │
//! │                                    (never a silent default of 1)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::is_usable_rate;

// =============================================================================
// Rate Lookup
// =============================================================================

/// Read-only access to an exchange-rate table.
pub trait RateLookup {
    /// Returns the rate converting one unit of `from` into `to`.
    fn rate(&self, from: &str, to: &str) -> Option<Decimal>;
}

impl<F> RateLookup for F
where
    F: Fn(&str, &str) -> Option<Decimal>,
{
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self(from, to)
    }
}

/// In-memory exchange-rate table keyed by `(from, to)`.
///
/// Pairs are directional: a `USD → GHS` entry says nothing about
/// `GHS → USD`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<(String, String), Decimal>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a directional rate.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>, rate: Decimal) {
        self.rates.insert((from.into(), to.into()), rate);
    }

    /// Builder-style [`RateTable::insert`].
    pub fn with_rate(mut self, from: impl Into<String>, to: impl Into<String>, rate: Decimal) -> Self {
        self.insert(from, to, rate);
        self
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl RateLookup for RateTable {
    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        self.rates
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves the exchange rate for a record.
///
/// ## Arguments
/// * `currency` - Transaction currency of the record
/// * `base_currency` - Default currency of the owning company
/// * `existing_rate` - Rate currently stored on the record (manual entry)
/// * `lookup` - Exchange-rate table
///
/// ## Returns
/// * `Ok(rate)` - Rate to store on the record (`None` only for the no-op case)
/// * `Err(ExchangeRateUnavailable)` - The user must enter a rate manually
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use renewal_core::currency::{resolve, RateTable};
///
/// let table = RateTable::new().with_rate("USD", "GHS", Decimal::new(155, 1));
///
/// let rate = resolve(Some("USD"), Some("GHS"), None, &table).unwrap();
/// assert_eq!(rate, Some(Decimal::new(155, 1)));
///
/// // Same currency is always exactly 1
/// let rate = resolve(Some("GHS"), Some("GHS"), Some(Decimal::TEN), &table).unwrap();
/// assert_eq!(rate, Some(Decimal::ONE));
/// ```
pub fn resolve<L>(
    currency: Option<&str>,
    base_currency: Option<&str>,
    existing_rate: Option<Decimal>,
    lookup: &L,
) -> CoreResult<Option<Decimal>>
where
    L: RateLookup + ?Sized,
{
    let (Some(currency), Some(base)) = (currency, base_currency) else {
        return Ok(existing_rate);
    };

    if currency == base {
        return Ok(Some(Decimal::ONE));
    }

    if is_usable_rate(existing_rate) {
        return Ok(existing_rate);
    }

    lookup
        .rate(currency, base)
        .map(Some)
        .ok_or_else(|| CoreError::ExchangeRateUnavailable {
            from: currency.to_string(),
            to: base.to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn table() -> RateTable {
        RateTable::new()
            .with_rate("USD", "GHS", d("15.5"))
            .with_rate("EUR", "XOF", d("655.957"))
    }

    #[test]
    fn test_same_currency_is_one_even_with_stored_rate() {
        let rate = resolve(Some("GHS"), Some("GHS"), Some(d("12.3")), &table()).unwrap();
        assert_eq!(rate, Some(Decimal::ONE));

        let always_seven = |_: &str, _: &str| Some(d("7"));
        let rate = resolve(Some("XOF"), Some("XOF"), None, &always_seven).unwrap();
        assert_eq!(rate, Some(Decimal::ONE));
    }

    #[test]
    fn test_manual_override_wins_over_table() {
        let rate = resolve(Some("USD"), Some("GHS"), Some(d("16")), &table()).unwrap();
        assert_eq!(rate, Some(d("16")));
    }

    #[test]
    fn test_non_positive_manual_rate_is_ignored() {
        let rate = resolve(Some("USD"), Some("GHS"), Some(Decimal::ZERO), &table()).unwrap();
        assert_eq!(rate, Some(d("15.5")));

        let rate = resolve(Some("USD"), Some("GHS"), Some(d("-3")), &table()).unwrap();
        assert_eq!(rate, Some(d("15.5")));
    }

    #[test]
    fn test_lookup_is_directional() {
        let err = resolve(Some("GHS"), Some("USD"), None, &table()).unwrap_err();
        assert_eq!(
            err,
            CoreError::ExchangeRateUnavailable {
                from: "GHS".into(),
                to: "USD".into()
            }
        );
    }

    #[test]
    fn test_missing_pair_never_defaults_to_one() {
        let empty = RateTable::new();
        let result = resolve(Some("USD"), Some("GHS"), None, &empty);
        assert!(matches!(result, Err(CoreError::ExchangeRateUnavailable { .. })));
    }

    #[test]
    fn test_unknown_base_currency_is_noop() {
        assert_eq!(resolve(Some("USD"), None, None, &table()).unwrap(), None);
        assert_eq!(
            resolve(Some("USD"), None, Some(d("2")), &table()).unwrap(),
            Some(d("2"))
        );
        assert_eq!(resolve(None, Some("GHS"), None, &table()).unwrap(), None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let lookup = table();
        let first = resolve(Some("EUR"), Some("XOF"), None, &lookup).unwrap();
        let second = resolve(Some("EUR"), Some("XOF"), first, &lookup).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Some(d("655.957")));
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |from: &str, to: &str| (from == "USD" && to == "GHS").then(|| d("15"));
        assert_eq!(
            resolve(Some("USD"), Some("GHS"), None, &lookup).unwrap(),
            Some(d("15"))
        );
    }
}
