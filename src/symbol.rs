//! Monitored symbols and their alert conditions

use crate::config::CompanyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of alert, the second half of a cooldown key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Price moved across a configured threshold
    Price,
    /// News item for the company
    News,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Price => "price",
            AlertKind::News => "news",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline a percent change is measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Previous trading day's close
    #[default]
    PreviousClose,
}

/// Required sign of the move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Any,
}

impl Direction {
    /// Whether a percent change has the sign this direction asks for.
    /// A zero change only matches `Any`.
    pub fn matches(&self, percent_change: Decimal) -> bool {
        match self {
            Direction::Up => percent_change > Decimal::ZERO,
            Direction::Down => percent_change < Decimal::ZERO,
            Direction::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Any => "any",
        }
    }
}

/// A configured price-alert rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCondition {
    #[serde(default)]
    pub comparison: Comparison,
    /// Minimum absolute move, in percent
    pub threshold_percent: Decimal,
    #[serde(default)]
    pub direction: Direction,
}

impl PriceCondition {
    pub fn new(threshold_percent: Decimal, direction: Direction) -> Self {
        Self {
            comparison: Comparison::PreviousClose,
            threshold_percent,
            direction,
        }
    }
}

/// A ticker under watch. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredSymbol {
    pub symbol: String,
    pub name: String,
    /// Market identifier (key under `markets`)
    pub market: String,
    pub conditions: Vec<PriceCondition>,
    pub alert_kinds: Vec<AlertKind>,
}

impl MonitoredSymbol {
    /// Symbol with price alerts enabled for the given conditions
    pub fn with_price_alerts(
        symbol: impl Into<String>,
        name: impl Into<String>,
        market: impl Into<String>,
        conditions: Vec<PriceCondition>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            market: market.into(),
            conditions,
            alert_kinds: vec![AlertKind::Price],
        }
    }

    pub fn from_company(market: &str, company: &CompanyConfig) -> Self {
        let mut alert_kinds = Vec::new();
        if company.price_alerts.enabled {
            alert_kinds.push(AlertKind::Price);
        }
        if company.news_alerts.enabled {
            alert_kinds.push(AlertKind::News);
        }

        Self {
            symbol: company.symbol.clone(),
            name: company.name.clone(),
            market: market.to_string(),
            conditions: company.price_alerts.conditions.clone(),
            alert_kinds,
        }
    }

    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        self.alert_kinds.contains(&kind)
    }

    /// Smallest configured threshold, used to scale volatility
    pub fn min_threshold(&self) -> Option<Decimal> {
        self.conditions.iter().map(|c| c.threshold_percent).min()
    }
}
