//! Bounded per-symbol fan-out

use crate::provider::ProviderError;
use crate::telemetry::{self, CounterMetric, LatencyMetric};
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::time::{Duration, Instant};

/// Run `fetch` for every symbol with at most `max_concurrent` in flight and a
/// per-request deadline. Every symbol gets a result; none aborts the others.
pub(crate) async fn fetch_all<T, F, Fut>(
    symbols: &[String],
    max_concurrent: usize,
    request_timeout: Duration,
    fetch: F,
) -> Vec<(String, Result<T, ProviderError>)>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    stream::iter(symbols.iter().cloned())
        .map(|symbol| {
            let request = fetch(symbol.clone());
            async move {
                let started = Instant::now();
                let result = match tokio::time::timeout(request_timeout, request).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(request_timeout)),
                };
                telemetry::record_latency(LatencyMetric::ProviderRequest, started.elapsed());
                telemetry::increment(CounterMetric::ProviderRequests);
                if result.is_err() {
                    telemetry::increment(CounterMetric::ProviderErrors);
                }
                (symbol, result)
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_every_symbol_gets_a_result() {
        let symbols = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let results = fetch_all(&symbols, 2, Duration::from_secs(1), |symbol| async move {
            if symbol == "B" {
                Err(ProviderError::Api("boom".to_string()))
            } else {
                Ok(symbol.len())
            }
        })
        .await;

        assert_eq!(results.len(), 3);
        let failed: Vec<_> = results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(s, _)| s.as_str())
            .collect();
        assert_eq!(failed, vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out() {
        let symbols = vec!["SLOW".to_string()];
        let results = fetch_all(&symbols, 1, Duration::from_secs(5), |_| async {
            std::future::pending::<Result<(), ProviderError>>().await
        })
        .await;

        assert!(matches!(results[0].1, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let symbols: Vec<String> = (0..10).map(|i| format!("S{i}")).collect();

        fetch_all(&symbols, 3, Duration::from_secs(1), |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(())
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
