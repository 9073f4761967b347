//! Wall-clock implementation of [`renewal_core::Clock`].

use chrono::{Local, NaiveDate};
use renewal_core::Clock;

/// Today's date in the deployment's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
