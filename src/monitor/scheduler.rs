//! Poll cadence selection

use super::VolatilityLevel;
use crate::config::Config;
use std::time::Duration;

/// Picks the delay before the next cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingScheduler {
    /// No monitored market open
    pub closed_delay: Duration,
    /// Markets open and moving
    pub volatile_delay: Duration,
    /// Markets open, steady state
    pub normal_delay: Duration,
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self {
            closed_delay: Duration::from_secs(300),
            volatile_delay: Duration::from_secs(60),
            normal_delay: Duration::from_secs(180),
        }
    }
}

impl From<&Config> for PollingScheduler {
    fn from(config: &Config) -> Self {
        Self {
            closed_delay: Duration::from_secs(config.monitor.closed_delay_secs),
            volatile_delay: Duration::from_secs(config.monitor.volatile_delay_secs),
            normal_delay: Duration::from_secs(config.global.update_interval),
        }
    }
}

impl PollingScheduler {
    pub fn next_delay(&self, market_open: bool, volatility: VolatilityLevel) -> Duration {
        match (market_open, volatility) {
            (false, _) => self.closed_delay,
            (true, VolatilityLevel::High) => self.volatile_delay,
            (true, VolatilityLevel::Normal) => self.normal_delay,
        }
    }
}
