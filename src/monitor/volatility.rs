//! Recent-volatility classification

use super::VolatilityLevel;
use crate::config::VolatilityConfig;
use rust_decimal::Decimal;

/// Last observed move of one evaluated symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMove {
    pub symbol: String,
    pub percent_change: Decimal,
    /// Smallest configured threshold for the symbol
    pub min_threshold: Option<Decimal>,
}

/// Classifies a cycle's moves; the scheduler only consumes the result
pub trait VolatilityClassifier: Send + Sync {
    fn classify(&self, moves: &[SymbolMove]) -> VolatilityLevel;
}

impl<F> VolatilityClassifier for F
where
    F: Fn(&[SymbolMove]) -> VolatilityLevel + Send + Sync,
{
    fn classify(&self, moves: &[SymbolMove]) -> VolatilityLevel {
        self(moves)
    }
}

/// High when enough symbols moved a sizeable fraction of their threshold
#[derive(Debug, Clone)]
pub struct ThresholdShareClassifier {
    /// Fraction of a symbol's smallest threshold that counts as a large move
    pub move_fraction: Decimal,
    /// Share of symbols that must make a large move
    pub symbol_share: Decimal,
}

impl Default for ThresholdShareClassifier {
    fn default() -> Self {
        Self::from(&VolatilityConfig::default())
    }
}

impl From<&VolatilityConfig> for ThresholdShareClassifier {
    fn from(config: &VolatilityConfig) -> Self {
        Self {
            move_fraction: config.move_fraction,
            symbol_share: config.symbol_share,
        }
    }
}

impl VolatilityClassifier for ThresholdShareClassifier {
    fn classify(&self, moves: &[SymbolMove]) -> VolatilityLevel {
        let considered: Vec<_> = moves
            .iter()
            .filter_map(|m| m.min_threshold.map(|t| (m.percent_change.abs(), t)))
            .collect();
        if considered.is_empty() {
            return VolatilityLevel::Normal;
        }

        let large = considered
            .iter()
            .filter(|(change, threshold)| *change >= *threshold * self.move_fraction)
            .count();
        let share = Decimal::from(large) / Decimal::from(considered.len());

        if share >= self.symbol_share {
            VolatilityLevel::High
        } else {
            VolatilityLevel::Normal
        }
    }
}
