//! CLI interface for price-sentinel
//!
//! Provides subcommands for:
//! - `run`: Monitor continuously until Ctrl-C
//! - `once`: Run a single cycle and print its report
//! - `config`: Show the loaded configuration

mod once;
mod run;

pub use once::OnceArgs;
pub use run::RunArgs;

use crate::config::Config;
use crate::provider::{AlphaVantageClient, AlphaVantageConfig};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "price-sentinel")]
#[command(about = "Equity price-movement monitor with threshold alerts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor all markets until interrupted
    Run(RunArgs),
    /// Run one monitoring cycle and exit
    Once(OnceArgs),
    /// Show configuration
    Config,
}

/// Market-data client built from the `provider` section
fn build_provider(config: &Config) -> anyhow::Result<AlphaVantageClient> {
    let timeout = Duration::from_secs(config.monitor.request_timeout_secs);
    let client = AlphaVantageClient::new(AlphaVantageConfig::from_provider_config(
        &config.provider,
        timeout,
    ))?;
    Ok(client)
}
