//! In-memory provider for unit tests

use super::{MarketDataProvider, PriceObservation, ProviderError};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct ScriptedProvider {
    prices: Mutex<HashMap<String, Decimal>>,
    closes: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<HashSet<String>>,
    current_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_symbol(self, symbol: &str, close: Decimal, price: Decimal) -> Self {
        self.set_close(symbol, close);
        self.set_price(symbol, price);
        self
    }

    pub(crate) fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub(crate) fn set_close(&self, symbol: &str, close: Decimal) {
        self.closes.lock().unwrap().insert(symbol.to_string(), close);
    }

    pub(crate) fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    pub(crate) fn recover(&self, symbol: &str) {
        self.failing.lock().unwrap().remove(symbol);
    }

    pub(crate) fn current_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self, symbol: &str) -> Result<(), ProviderError> {
        if self.failing.lock().unwrap().contains(symbol) {
            return Err(ProviderError::Api(format!("scripted failure for {symbol}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn current_price(&self, symbol: &str) -> Result<PriceObservation, ProviderError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;
        let price = self.prices.lock().unwrap().get(symbol).copied();
        price
            .map(|p| PriceObservation::new(symbol, p))
            .ok_or_else(|| ProviderError::NoData {
                symbol: symbol.to_string(),
                detail: "no scripted price".to_string(),
            })
    }

    async fn previous_close(&self, symbol: &str, _date: NaiveDate) -> Result<Decimal, ProviderError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing(symbol)?;
        let close = self.closes.lock().unwrap().get(symbol).copied();
        close.ok_or_else(|| ProviderError::NoData {
            symbol: symbol.to_string(),
            detail: "no scripted close".to_string(),
        })
    }
}
