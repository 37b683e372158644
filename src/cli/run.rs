//! Run command implementation

use super::build_provider;
use crate::config::Config;
use crate::monitor::MonitorLoop;
use crate::notify::Dispatcher;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Watch every market from a single loop instead of one loop per market
    #[arg(long)]
    pub combined: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let provider = Arc::new(build_provider(config)?);
        let notifier = Arc::new(Dispatcher::from_config(config)?);
        let calendars = config.market_calendars()?;

        let groups = if self.combined {
            vec![calendars]
        } else {
            calendars.into_iter().map(|c| vec![c]).collect()
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();
        for markets in groups {
            let monitor = Arc::new(MonitorLoop::from_config(
                config,
                markets,
                provider.clone(),
                notifier.clone(),
            ));
            if monitor.symbols().is_empty() {
                tracing::info!(
                    markets = ?monitor.markets().iter().map(|m| m.id()).collect::<Vec<_>>(),
                    "No price alerts configured, skipping"
                );
                continue;
            }
            handles.push(tokio::spawn(monitor.run(shutdown_rx.clone())));
        }

        if handles.is_empty() {
            anyhow::bail!("no symbols with price alerts enabled");
        }
        tracing::info!(loops = handles.len(), "Monitoring started, press Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested");
        // Loops also stop if every receiver is already gone
        let _ = shutdown_tx.send(true);

        for handle in handles {
            handle.await?;
        }
        Ok(())
    }
}
