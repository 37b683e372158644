//! Market-data provider module
//!
//! Current prices and previous closes for monitored symbols

mod alphavantage;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use alphavantage::{AlphaVantageClient, AlphaVantageConfig};
pub use types::{PriceObservation, ProviderError};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Trait for market-data provider implementations
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest traded price for a symbol
    async fn current_price(&self, symbol: &str) -> Result<PriceObservation, ProviderError>;
    /// Close of the last trading day before `date`
    async fn previous_close(&self, symbol: &str, date: NaiveDate) -> Result<Decimal, ProviderError>;
}
