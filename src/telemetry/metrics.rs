//! Prometheus metrics

use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Market-data requests issued
    ProviderRequests,
    /// Market-data requests that failed or timed out
    ProviderErrors,
    /// Alerts handed to at least one channel successfully
    AlertsDispatched,
    /// Alerts held back by a cooldown
    AlertsSuppressed,
    /// Alerts no channel accepted
    AlertsFailed,
    /// Symbols skipped for an unusable reference price
    EvaluationGuards,
    /// Cycles that ended in timeout or panic
    CycleErrors,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Markets open in the last cycle
    OpenMarkets,
    /// Symbols with price alerts under watch
    MonitoredSymbols,
    /// Active cooldown entries
    CooldownEntries,
}

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One market-data request
    ProviderRequest,
    /// One full cycle
    Cycle,
    /// Sending one alert to all channels
    Dispatch,
}

fn counter_name(metric: CounterMetric) -> &'static str {
    match metric {
        CounterMetric::ProviderRequests => "sentinel_provider_requests_total",
        CounterMetric::ProviderErrors => "sentinel_provider_errors_total",
        CounterMetric::AlertsDispatched => "sentinel_alerts_dispatched_total",
        CounterMetric::AlertsSuppressed => "sentinel_alerts_suppressed_total",
        CounterMetric::AlertsFailed => "sentinel_alerts_failed_total",
        CounterMetric::EvaluationGuards => "sentinel_evaluation_guards_total",
        CounterMetric::CycleErrors => "sentinel_cycle_errors_total",
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    ::metrics::counter!(counter_name(metric)).increment(1);
}

/// Count a failed send on one notification channel
pub fn record_channel_failure(channel: &'static str) {
    ::metrics::counter!("sentinel_channel_failures_total", "channel" => channel).increment(1);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::ProviderRequest => "sentinel_provider_request_latency_ms",
        LatencyMetric::Cycle => "sentinel_cycle_latency_ms",
        LatencyMetric::Dispatch => "sentinel_dispatch_latency_ms",
    };

    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::OpenMarkets => "sentinel_open_markets",
        GaugeMetric::MonitoredSymbols => "sentinel_monitored_symbols",
        GaugeMetric::CooldownEntries => "sentinel_cooldown_entries",
    };

    ::metrics::gauge!(metric_name).set(value);
}

/// Install the Prometheus exporter with an HTTP listener on `port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics listening");
    Ok(())
}
