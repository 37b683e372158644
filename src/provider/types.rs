//! Provider types

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One price observation for a symbol, valid for the current cycle only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Ticker (e.g., "AAPL")
    pub symbol: String,
    /// Last traded price
    pub price: Decimal,
    /// Local timestamp when the observation was received
    pub timestamp: DateTime<Utc>,
    /// Bar time as reported by the exchange, in exchange local time
    pub exchange_time: Option<NaiveDateTime>,
    /// Traded volume of the bar, if reported
    pub volume: Option<u64>,
}

impl PriceObservation {
    pub fn new(symbol: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: Utc::now(),
            exchange_time: None,
            volume: None,
        }
    }
}

/// Per-symbol provider failures. Recoverable: the symbol is skipped for the cycle.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Provider asked us to slow down
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Provider reported an error in the response body
    #[error("provider error: {0}")]
    Api(String),
    /// Expected time series key absent from the response
    #[error("response missing series '{0}'")]
    MissingSeries(String),
    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Series present but holds no usable bar
    #[error("no data for {symbol}: {detail}")]
    NoData { symbol: String, detail: String },
    /// Price missing, unparseable or not positive
    #[error("invalid price '{0}'")]
    InvalidPrice(String),
    /// Request exceeded its deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
