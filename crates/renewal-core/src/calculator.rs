//! # Line & Total Calculator
//!
//! Computes per-item amounts and document-level totals.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineItem { qty: 2, rate: 100 }        exchange_rate: 1.5 (USD → GHS)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  amount      = round(qty,2) × round(rate,2)       = 200.00 USD         │
//! │  base_rate   = round(rate,2) × exchange_rate      = 150.00 GHS         │
//! │  base_amount = round(amount,2) × exchange_rate    = 300.00 GHS         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  net_total      = Σ round(amount,2)                                    │
//! │  net_total_base = Σ round(base_amount,2)                               │
//! │                                                                         │
//! │  Same currency? base_rate = rate, base_amount = amount                 │
//! │  (no multiplication, so no rounding drift)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{effective_exchange_rate, round_money, sum_rounded};
use crate::types::LineItem;

/// Document-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Transaction currency.
    pub net_total: Decimal,
    /// Company base currency.
    pub net_total_base: Decimal,
}

/// Recomputes `amount`, `base_rate` and `base_amount` on every item.
///
/// Conversion applies only when both currencies are known and differ.
/// `exchange_rate` of `None` or zero is treated as `1`.
pub fn compute_lines(
    items: &mut [LineItem],
    exchange_rate: Option<Decimal>,
    currency: Option<&str>,
    base_currency: Option<&str>,
) {
    let rate = effective_exchange_rate(exchange_rate);
    let convert = matches!((currency, base_currency), (Some(c), Some(b)) if c != b);

    for item in items.iter_mut() {
        item.amount = round_money(item.qty) * round_money(item.rate);

        if convert {
            item.base_rate = round_money(item.rate) * rate;
            item.base_amount = round_money(item.amount) * rate;
        } else {
            item.base_rate = item.rate;
            item.base_amount = item.amount;
        }
    }
}

/// Sums item amounts, rounding each term to 2 decimals first.
///
/// An empty list yields exactly zero for both totals.
pub fn compute_totals(items: &[LineItem]) -> Totals {
    Totals {
        net_total: sum_rounded(items.iter().map(|i| i.amount)),
        net_total_base: sum_rounded(items.iter().map(|i| i.base_amount)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
