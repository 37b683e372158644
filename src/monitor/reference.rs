//! Previous-close reference prices, refreshed once per trading day

use super::fetch::fetch_all;
use crate::provider::MarketDataProvider;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cached previous close for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePrice {
    pub price: Decimal,
    /// Trading date this reference serves as baseline for
    pub as_of: NaiveDate,
}

/// Outcome of `ensure_fresh`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Cache was already current; nothing fetched
    pub skipped: bool,
    pub refreshed: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    refreshed_on: Option<NaiveDate>,
    entries: HashMap<String, ReferencePrice>,
}

/// Per-symbol previous-close cache. At most one entry per symbol.
#[derive(Debug, Default)]
pub struct ReferencePriceCache {
    state: RwLock<CacheState>,
}

impl ReferencePriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refetch previous closes that are not yet dated `today`.
    ///
    /// A new day refetches every symbol. Within the same day only symbols
    /// whose last fetch failed are retried, so a fully fresh cache makes no
    /// provider calls. A failed symbol keeps its old entry (or stays absent).
    pub async fn ensure_fresh(
        &self,
        provider: &dyn MarketDataProvider,
        symbols: &[String],
        today: NaiveDate,
        request_timeout: Duration,
        max_concurrent: usize,
    ) -> RefreshSummary {
        let pending: Vec<String> = {
            let state = self.state.read().await;
            if state.refreshed_on == Some(today) {
                symbols
                    .iter()
                    .filter(|s| state.entries.get(*s).map(|e| e.as_of) != Some(today))
                    .cloned()
                    .collect()
            } else {
                symbols.to_vec()
            }
        };

        if pending.is_empty() {
            return RefreshSummary {
                skipped: true,
                ..Default::default()
            };
        }

        tracing::info!(%today, symbols = pending.len(), "Refreshing previous closes");

        let results = fetch_all(&pending, max_concurrent, request_timeout, |symbol| async move {
            provider.previous_close(&symbol, today).await
        })
        .await;

        let mut summary = RefreshSummary::default();
        let mut state = self.state.write().await;
        for (symbol, result) in results {
            match result {
                Ok(price) => {
                    state.entries.insert(symbol, ReferencePrice { price, as_of: today });
                    summary.refreshed += 1;
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Previous close unavailable");
                    summary.failed.push(symbol);
                }
            }
        }
        state.refreshed_on = Some(today);
        summary.failed.sort();

        summary
    }

    /// Cached price regardless of age
    pub async fn get(&self, symbol: &str) -> Option<Decimal> {
        self.entry(symbol).await.map(|e| e.price)
    }

    /// Cached price only if it was refreshed for `today`
    pub async fn get_fresh(&self, symbol: &str, today: NaiveDate) -> Option<Decimal> {
        self.entry(symbol)
            .await
            .filter(|e| e.as_of == today)
            .map(|e| e.price)
    }

    pub async fn entry(&self, symbol: &str) -> Option<ReferencePrice> {
        self.state.read().await.entries.get(symbol).copied()
    }

    /// Trading date of the last refresh
    pub async fn refreshed_on(&self) -> Option<NaiveDate> {
        self.state.read().await.refreshed_on
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedProvider;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_absent_before_first_refresh() {
        let cache = ReferencePriceCache::new();
        assert_eq!(cache.get("XYZ").await, None);
        assert_eq!(cache.refreshed_on().await, None);
    }

    #[tokio::test]
    async fn test_second_call_same_day_is_noop() {
        let provider = ScriptedProvider::new().with_symbol("XYZ", dec!(100), dec!(101));
        let cache = ReferencePriceCache::new();
        let list = symbols(&["XYZ"]);

        let first = cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;
        assert_eq!(first.refreshed, 1);
        assert_eq!(provider.close_calls(), 1);

        let second = cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;
        assert!(second.skipped);
        assert_eq!(provider.close_calls(), 1);
        assert_eq!(cache.get("XYZ").await, Some(dec!(100)));
    }

    #[tokio::test]
    async fn test_new_day_overwrites() {
        let provider = ScriptedProvider::new().with_symbol("XYZ", dec!(100), dec!(101));
        let cache = ReferencePriceCache::new();
        let list = symbols(&["XYZ"]);

        cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;
        provider.set_close("XYZ", dec!(104));
        cache.ensure_fresh(&provider, &list, day(12), TIMEOUT, 4).await;

        assert_eq!(provider.close_calls(), 2);
        assert_eq!(
            cache.entry("XYZ").await,
            Some(ReferencePrice {
                price: dec!(104),
                as_of: day(12)
            })
        );
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_others_and_stale_entry() {
        let provider = ScriptedProvider::new()
            .with_symbol("AAA", dec!(10), dec!(10))
            .with_symbol("BBB", dec!(20), dec!(20));
        let cache = ReferencePriceCache::new();
        let list = symbols(&["AAA", "BBB"]);

        cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;

        provider.fail("AAA");
        provider.set_close("BBB", dec!(21));
        let summary = cache.ensure_fresh(&provider, &list, day(12), TIMEOUT, 4).await;

        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.failed, vec!["AAA".to_string()]);
        assert_eq!(cache.refreshed_on().await, Some(day(12)));

        // AAA keeps yesterday's entry but is not fresh for today
        assert_eq!(cache.get("AAA").await, Some(dec!(10)));
        assert_eq!(cache.get_fresh("AAA", day(12)).await, None);
        assert_eq!(cache.get_fresh("BBB", day(12)).await, Some(dec!(21)));
    }

    #[tokio::test]
    async fn test_failure_on_first_run_leaves_absent() {
        let provider = ScriptedProvider::new();
        provider.fail("XYZ");
        let cache = ReferencePriceCache::new();

        let summary = cache
            .ensure_fresh(&provider, &symbols(&["XYZ"]), day(11), TIMEOUT, 4)
            .await;

        assert_eq!(summary.failed, vec!["XYZ".to_string()]);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_symbol_retried_same_day() {
        let provider = ScriptedProvider::new()
            .with_symbol("AAA", dec!(10), dec!(10))
            .with_symbol("BBB", dec!(20), dec!(20));
        provider.fail("AAA");
        let cache = ReferencePriceCache::new();
        let list = symbols(&["AAA", "BBB"]);

        let first = cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;
        assert_eq!(first.failed, vec!["AAA".to_string()]);
        assert_eq!(provider.close_calls(), 2);

        provider.recover("AAA");
        let second = cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;
        assert!(!second.skipped);
        assert_eq!(second.refreshed, 1);
        // Only the failed symbol is fetched again
        assert_eq!(provider.close_calls(), 3);
        assert_eq!(cache.get_fresh("AAA", day(11)).await, Some(dec!(10)));

        let third = cache.ensure_fresh(&provider, &list, day(11), TIMEOUT, 4).await;
        assert!(third.skipped);
        assert_eq!(provider.close_calls(), 3);
    }
}
