//! Alert decision module
//!
//! Threshold evaluation and per-symbol cooldown gating

mod cooldown;
mod threshold;
mod types;

pub use cooldown::AlertCooldownTracker;
pub use threshold::ThresholdEvaluator;
pub use types::{AlertRecord, CompanyInfo, Evaluation, EvaluationGuard, TriggeredCondition};
