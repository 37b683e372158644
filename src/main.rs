use anyhow::Context;
use clap::Parser;
use price_sentinel::cli::{Cli, Commands};
use price_sentinel::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal; the monitor never starts on one
    let config = Config::load(&cli.config)
        .with_context(|| format!("could not load config from {}", cli.config))?;

    let _telemetry = price_sentinel::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting price monitor");
            args.execute(&config).await?;
        }
        Commands::Once(args) => {
            tracing::info!("Running single cycle");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Poll: every {}s, {}s volatile, {}s closed",
                config.global.update_interval,
                config.monitor.volatile_delay_secs,
                config.monitor.closed_delay_secs
            );
            for (id, market) in &config.markets {
                println!(
                    "  Market {}: {} {} {}-{}",
                    id,
                    market.exchange,
                    market.currency,
                    market.market_hours.regular.start,
                    market.market_hours.regular.end
                );
            }
            for symbol in config.monitored_symbols() {
                let kinds: Vec<_> = symbol.alert_kinds.iter().map(|k| k.as_str()).collect();
                println!(
                    "    {} {} [{}]",
                    symbol.symbol,
                    symbol.name,
                    kinds.join(", ")
                );
            }
            println!(
                "  Cooldowns: price {}s, news {}s",
                config.monitor.cooldowns.price_secs, config.monitor.cooldowns.news_secs
            );
            println!(
                "  Notifications: {} {:?}",
                if config.notifications.enabled { "enabled" } else { "disabled" },
                config.notifications.channels
            );
        }
    }

    Ok(())
}
