//! Monitor module
//!
//! The per-cycle state machine and the state it owns:
//! - Previous-close reference cache
//! - Poll cadence selection
//! - Volatility classification

mod engine;
mod fetch;
mod reference;
mod scheduler;
mod types;
mod volatility;

pub use engine::{Clock, MonitorLoop};
pub use reference::{ReferencePrice, ReferencePriceCache, RefreshSummary};
pub use scheduler::PollingScheduler;
pub use types::{CycleError, CycleReport, LoopSettings, MonitorState, VolatilityLevel};
pub use volatility::{SymbolMove, ThresholdShareClassifier, VolatilityClassifier};
