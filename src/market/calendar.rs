//! Exchange trading calendar

use crate::config::{ConfigError, MarketConfig};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use std::collections::HashSet;

/// Trading hours, weekdays and holidays for one market
#[derive(Debug, Clone)]
pub struct MarketCalendar {
    id: String,
    exchange: String,
    currency: String,
    offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
    holidays: HashSet<NaiveDate>,
    ignore_hours: bool,
}

impl MarketCalendar {
    /// Create a calendar with a regular session in exchange local time
    pub fn new(id: impl Into<String>, offset: FixedOffset, open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            id: id.into(),
            exchange: String::new(),
            currency: String::new(),
            offset,
            open,
            close,
            holidays: HashSet::new(),
            ignore_hours: false,
        }
    }

    /// Build from the `markets.<id>` config table
    pub fn from_config(id: &str, config: &MarketConfig) -> Result<Self, ConfigError> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "market '{id}': utc_offset_minutes {} out of range",
                config.utc_offset_minutes
            ))
        })?;
        let open = parse_session_time(id, &config.market_hours.regular.start)?;
        let close = parse_session_time(id, &config.market_hours.regular.end)?;
        if open >= close {
            return Err(ConfigError::Invalid(format!(
                "market '{id}': session start must be before end"
            )));
        }

        Ok(Self {
            id: id.to_string(),
            exchange: config.exchange.clone(),
            currency: config.currency.clone(),
            offset,
            open,
            close,
            holidays: config.holidays.iter().copied().collect(),
            ignore_hours: false,
        })
    }

    /// Add exchange holidays
    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Treat the market as always open
    pub fn ignore_hours(mut self, ignore: bool) -> Self {
        self.ignore_hours = ignore;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Wall-clock time at the exchange
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.offset).naive_local()
    }

    /// Trading date at the exchange
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_time(now).date()
    }

    /// Weekday that is not a holiday
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Whether the regular session is in progress at `now`
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if self.ignore_hours {
            return true;
        }
        let local = self.local_time(now);
        self.is_trading_day(local.date()) && local.time() >= self.open && local.time() < self.close
    }
}

fn parse_session_time(id: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| {
        ConfigError::Invalid(format!("market '{id}': bad session time '{value}': {e}"))
    })
}
