//! Once command implementation

use super::build_provider;
use crate::config::Config;
use crate::monitor::MonitorLoop;
use crate::notify::{AlertFormatter, Dispatcher};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Treat every market as open
    #[arg(long)]
    pub ignore_hours: bool,

    /// Log alerts instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl OnceArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let provider = Arc::new(build_provider(config)?);
        let notifier = if self.dry_run {
            Dispatcher::log_only(AlertFormatter::from(&config.alert_format))
        } else {
            Dispatcher::from_config(config)?
        };
        let calendars = config
            .market_calendars()?
            .into_iter()
            .map(|c| c.ignore_hours(self.ignore_hours))
            .collect();

        let monitor = MonitorLoop::from_config(config, calendars, provider, Arc::new(notifier));
        let report = monitor.run_once().await;
        report.log();

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
