//! Monitor loop types

use crate::config::Config;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Phase of the monitor loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorState {
    /// Constructed, no cycle run yet
    Idle,
    CheckingMarket,
    RefreshingReferences,
    Polling,
    Evaluating,
    Dispatching,
    /// Sleeping until the next cycle
    Waiting,
    /// Shut down; terminal
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::CheckingMarket => "checking_market",
            MonitorState::RefreshingReferences => "refreshing_references",
            MonitorState::Polling => "polling",
            MonitorState::Evaluating => "evaluating",
            MonitorState::Dispatching => "dispatching",
            MonitorState::Waiting => "waiting",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Classification of recent price movement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum VolatilityLevel {
    #[default]
    Normal,
    High,
}

/// Failures contained at the loop boundary; each one triggers the recovery delay
#[derive(Debug, Error)]
pub enum CycleError {
    /// The cycle exceeded its overall cap
    #[error("cycle exceeded {0:?}")]
    TimedOut(Duration),
    /// The cycle task panicked
    #[error("cycle panicked: {0}")]
    Panicked(String),
    /// The cycle task was cancelled outside of shutdown
    #[error("cycle aborted")]
    Aborted,
}

impl From<tokio::task::JoinError> for CycleError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            CycleError::Aborted
        } else {
            CycleError::Panicked(err.to_string())
        }
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Markets found open
    pub open_markets: Vec<String>,
    /// Symbols whose current price was requested
    pub symbols_polled: usize,
    /// Symbols whose price or reference fetch failed
    pub provider_failures: Vec<String>,
    /// Symbols priced but without a reference for today
    pub missing_reference: Vec<String>,
    /// Symbols skipped because their reference price was unusable
    pub guarded: Vec<String>,
    /// Symbols evaluated against a reference price
    pub symbols_evaluated: usize,
    pub alerts_dispatched: usize,
    pub alerts_suppressed: usize,
    pub alerts_failed: usize,
    pub volatility: VolatilityLevel,
    #[serde(with = "duration_secs")]
    pub next_delay: Duration,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            open_markets: Vec::new(),
            symbols_polled: 0,
            provider_failures: Vec::new(),
            missing_reference: Vec::new(),
            guarded: Vec::new(),
            symbols_evaluated: 0,
            alerts_dispatched: 0,
            alerts_suppressed: 0,
            alerts_failed: 0,
            volatility: VolatilityLevel::Normal,
            next_delay: Duration::ZERO,
        }
    }

    pub fn markets_open(&self) -> bool {
        !self.open_markets.is_empty()
    }

    pub fn log(&self) {
        tracing::info!(
            open_markets = ?self.open_markets,
            polled = self.symbols_polled,
            evaluated = self.symbols_evaluated,
            failures = self.provider_failures.len(),
            missing_reference = self.missing_reference.len(),
            guarded = self.guarded.len(),
            dispatched = self.alerts_dispatched,
            suppressed = self.alerts_suppressed,
            failed = self.alerts_failed,
            volatility = ?self.volatility,
            next_delay_secs = self.next_delay.as_secs(),
            "Cycle complete"
        );
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

/// Timing and policy knobs for one loop instance
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Deadline for each provider request
    pub request_timeout: Duration,
    /// Cap on a full cycle
    pub cycle_timeout: Duration,
    /// Delay after a failed cycle
    pub recovery_delay: Duration,
    /// Provider requests in flight at once
    pub max_concurrent_fetches: usize,
    /// Consume the cooldown window when every channel failed
    pub record_cooldown_on_failure: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            cycle_timeout: Duration::from_secs(120),
            recovery_delay: Duration::from_secs(60),
            max_concurrent_fetches: 4,
            record_cooldown_on_failure: true,
        }
    }
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        let m = &config.monitor;
        Self {
            request_timeout: Duration::from_secs(m.request_timeout_secs),
            cycle_timeout: Duration::from_secs(m.cycle_timeout_secs),
            recovery_delay: Duration::from_secs(m.recovery_delay_secs),
            max_concurrent_fetches: m.max_concurrent_fetches,
            record_cooldown_on_failure: m.record_cooldown_on_failure,
        }
    }
}
