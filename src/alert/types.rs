//! Alert types

use crate::provider::PriceObservation;
use crate::symbol::{AlertKind, MonitoredSymbol, PriceCondition};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A configured condition met by the current move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredCondition {
    pub condition: PriceCondition,
    /// Signed percent change that met the condition
    pub percent_change: Decimal,
}

/// Result of evaluating one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Signed percent change against the reference price
    pub percent_change: Decimal,
    /// Conditions met, in configuration order
    pub triggered: Vec<TriggeredCondition>,
}

impl Evaluation {
    /// Triggered condition with the highest threshold
    pub fn strongest(&self) -> Option<&TriggeredCondition> {
        self.triggered
            .iter()
            .max_by_key(|t| t.condition.threshold_percent)
    }
}

/// Data anomalies that skip evaluation for a symbol without failing the cycle
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationGuard {
    /// Reference price is zero
    #[error("reference price for {0} is zero")]
    ZeroReference(String),
    /// Reference price is negative
    #[error("reference price for {symbol} is negative ({price})")]
    NegativeReference { symbol: String, price: Decimal },
    /// Percent change does not fit in a decimal
    #[error("percent change for {0} overflowed")]
    Overflow(String),
}

/// Company metadata attached to an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub market: String,
    pub exchange: String,
    pub currency: String,
}

/// An alert ready for dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Unique alert identifier
    pub id: Uuid,
    pub symbol: String,
    pub kind: AlertKind,
    pub company: CompanyInfo,
    /// Observed price
    pub price: Decimal,
    /// Baseline the change was measured against
    pub reference_price: Decimal,
    /// Signed percent change
    pub percent_change: Decimal,
    /// Condition that triggered the alert
    pub condition: PriceCondition,
    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Build a price alert from a triggered condition
    pub fn price_alert(
        symbol: &MonitoredSymbol,
        company: CompanyInfo,
        observation: &PriceObservation,
        reference_price: Decimal,
        triggered: &TriggeredCondition,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.symbol.clone(),
            kind: AlertKind::Price,
            company,
            price: observation.price,
            reference_price,
            percent_change: triggered.percent_change,
            condition: triggered.condition.clone(),
            generated_at,
        }
    }

    pub fn is_up(&self) -> bool {
        self.percent_change > Decimal::ZERO
    }
}
