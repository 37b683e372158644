//! Market calendar module
//!
//! Decides which monitored exchanges are trading at a given instant

mod calendar;

pub use calendar::MarketCalendar;

use chrono::{DateTime, Utc};

/// Markets whose regular session is in progress at `now`
pub fn open_markets(calendars: &[MarketCalendar], now: DateTime<Utc>) -> Vec<&MarketCalendar> {
    calendars.iter().filter(|c| c.is_open(now)).collect()
}
