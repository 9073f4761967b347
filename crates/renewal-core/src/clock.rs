//! # Clock
//!
//! "Today" is an input to every stage calculation. The core never reads
//! the system clock; the wall-clock implementation lives in renewal-jobs.

use chrono::NaiveDate;

/// Source of the current calendar date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// A clock pinned to one date. Used by tests and by `classify --today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
