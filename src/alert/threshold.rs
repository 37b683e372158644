//! Threshold evaluation
//!
//! Pure: no I/O and no shared state.

use super::{Evaluation, EvaluationGuard, TriggeredCondition};
use crate::symbol::PriceCondition;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decides which price conditions the current move satisfies
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// `(current - reference) / reference * 100`, or `None` when undefined
    pub fn percent_change(current: Decimal, reference: Decimal) -> Option<Decimal> {
        if reference.is_zero() {
            return None;
        }
        (current - reference)
            .checked_div(reference)?
            .checked_mul(dec!(100))
    }

    /// Evaluate every condition independently against the move from `reference` to `current`
    pub fn evaluate(
        &self,
        symbol: &str,
        current: Decimal,
        reference: Decimal,
        conditions: &[PriceCondition],
    ) -> Result<Evaluation, EvaluationGuard> {
        if reference.is_zero() {
            return Err(EvaluationGuard::ZeroReference(symbol.to_string()));
        }
        if reference.is_sign_negative() {
            return Err(EvaluationGuard::NegativeReference {
                symbol: symbol.to_string(),
                price: reference,
            });
        }

        let percent_change = Self::percent_change(current, reference)
            .ok_or_else(|| EvaluationGuard::Overflow(symbol.to_string()))?;

        let triggered = conditions
            .iter()
            .filter(|c| {
                percent_change.abs() >= c.threshold_percent && c.direction.matches(percent_change)
            })
            .map(|c| TriggeredCondition {
                condition: c.clone(),
                percent_change,
            })
            .collect();

        Ok(Evaluation {
            percent_change,
            triggered,
        })
    }
}
