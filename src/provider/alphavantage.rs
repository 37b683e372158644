//! Alpha Vantage HTTP client
//!
//! Current price comes from the newest intraday bar, previous close from the
//! daily series. Both endpoints return a JSON object keyed by bar time.

use super::{MarketDataProvider, PriceObservation, ProviderError};
use crate::config::{resolve_secret, ProviderConfig};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Alpha Vantage base URL
pub const ALPHAVANTAGE_URL: &str = "https://www.alphavantage.co";

const DAILY_SERIES: &str = "Time Series (Daily)";

/// Configuration for the Alpha Vantage client
#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    /// Base URL for the API
    pub base_url: String,
    /// API key (the public "demo" key only serves a few symbols)
    pub api_key: String,
    /// Intraday interval (e.g., "1min")
    pub interval: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            base_url: ALPHAVANTAGE_URL.to_string(),
            api_key: "demo".to_string(),
            interval: "1min".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl AlphaVantageConfig {
    pub fn from_provider_config(config: &ProviderConfig, timeout: Duration) -> Self {
        let api_key = resolve_secret(config.api_key.as_deref(), config.api_key_env.as_deref())
            .unwrap_or_else(|| {
                tracing::warn!("No Alpha Vantage API key configured, using the demo key");
                "demo".to_string()
            });

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            interval: config.interval.clone(),
            timeout,
        }
    }

    fn intraday_series(&self) -> String {
        format!("Time Series ({})", self.interval)
    }
}

/// One OHLCV bar; Alpha Vantage sends every field as a string
#[derive(Debug, Deserialize)]
struct Bar {
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

/// Client for the Alpha Vantage time series API
pub struct AlphaVantageClient {
    config: AlphaVantageConfig,
    client: Client,
}

impl AlphaVantageClient {
    /// Create a new client with custom configuration
    pub fn new(config: AlphaVantageConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Issue a query and return the decoded body after checking for in-band errors
    async fn query(&self, params: &[(&str, &str)]) -> Result<Value, ProviderError> {
        let url = format!("{}/query", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.config.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        let body: Value = response.json().await?;
        check_api_messages(&body)?;
        Ok(body)
    }
}

/// Alpha Vantage reports throttling and bad requests with HTTP 200
fn check_api_messages(body: &Value) -> Result<(), ProviderError> {
    for key in ["Note", "Information"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            return Err(ProviderError::RateLimited(msg.to_string()));
        }
    }
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(ProviderError::Api(msg.to_string()));
    }
    Ok(())
}

fn series(body: &Value, key: &str) -> Result<BTreeMap<String, Bar>, ProviderError> {
    let raw = body
        .get(key)
        .ok_or_else(|| ProviderError::MissingSeries(key.to_string()))?;
    Ok(serde_json::from_value(raw.clone())?)
}

fn parse_price(raw: &str) -> Result<Decimal, ProviderError> {
    match Decimal::from_str(raw.trim()) {
        Ok(price) if price > Decimal::ZERO => Ok(price),
        _ => Err(ProviderError::InvalidPrice(raw.to_string())),
    }
}

/// Newest bar of an intraday series
fn parse_intraday(
    symbol: &str,
    body: &Value,
    series_key: &str,
) -> Result<PriceObservation, ProviderError> {
    let bars = series(body, series_key)?;
    // Keys are "YYYY-MM-DD HH:MM:SS", so lexical order is time order
    let (time, bar) = bars.iter().next_back().ok_or_else(|| ProviderError::NoData {
        symbol: symbol.to_string(),
        detail: "empty intraday series".to_string(),
    })?;

    Ok(PriceObservation {
        symbol: symbol.to_string(),
        price: parse_price(&bar.close)?,
        timestamp: Utc::now(),
        exchange_time: NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").ok(),
        volume: bar.volume.as_deref().and_then(|v| v.trim().parse().ok()),
    })
}

/// Close of the latest daily bar strictly before `date`
fn parse_previous_close(symbol: &str, body: &Value, date: NaiveDate) -> Result<Decimal, ProviderError> {
    let bars = series(body, DAILY_SERIES)?;
    let cutoff = date.format("%Y-%m-%d").to_string();

    let (_, bar) = bars
        .iter()
        .rev()
        .find(|(day, _)| day.as_str() < cutoff.as_str())
        .ok_or_else(|| ProviderError::NoData {
            symbol: symbol.to_string(),
            detail: format!("no daily bar before {cutoff}"),
        })?;

    parse_price(&bar.close)
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    async fn current_price(&self, symbol: &str) -> Result<PriceObservation, ProviderError> {
        tracing::debug!(symbol, "Fetching intraday price");

        let body = self
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol),
                ("interval", self.config.interval.as_str()),
            ])
            .await?;

        parse_intraday(symbol, &body, &self.config.intraday_series())
    }

    async fn previous_close(&self, symbol: &str, date: NaiveDate) -> Result<Decimal, ProviderError> {
        tracing::debug!(symbol, %date, "Fetching previous close");

        let body = self
            .query(&[("function", "TIME_SERIES_DAILY"), ("symbol", symbol)])
            .await?;

        parse_previous_close(symbol, &body, date)
    }
}
