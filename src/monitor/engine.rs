//! Monitor loop
//!
//! Each cycle walks CheckingMarket, RefreshingReferences, Polling, Evaluating
//! and Dispatching, then the loop sleeps for the scheduler's delay. A cycle
//! runs as its own task so a timeout, panic or shutdown can cut it short
//! without taking the loop down.

use super::fetch::fetch_all;
use super::{
    CycleError, CycleReport, LoopSettings, MonitorState, PollingScheduler, ReferencePriceCache,
    SymbolMove, ThresholdShareClassifier, VolatilityClassifier, VolatilityLevel,
};
use crate::alert::{AlertCooldownTracker, AlertRecord, CompanyInfo, ThresholdEvaluator};
use crate::config::{Config, CooldownConfig};
use crate::market::{open_markets, MarketCalendar};
use crate::notify::Notifier;
use crate::provider::{MarketDataProvider, PriceObservation};
use crate::symbol::{AlertKind, MonitoredSymbol};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

/// Source of wall-clock time for market hours and cooldowns
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Polls prices for a set of markets and dispatches threshold alerts
pub struct MonitorLoop {
    markets: Vec<MarketCalendar>,
    symbols: Vec<MonitoredSymbol>,
    provider: Arc<dyn MarketDataProvider>,
    notifier: Arc<dyn Notifier>,
    references: HashMap<String, ReferencePriceCache>,
    cooldowns: AlertCooldownTracker,
    evaluator: ThresholdEvaluator,
    scheduler: PollingScheduler,
    classifier: Box<dyn VolatilityClassifier>,
    settings: LoopSettings,
    state: RwLock<MonitorState>,
    clock: Clock,
}

impl MonitorLoop {
    /// Create a loop over `markets`. Symbols outside those markets, or
    /// without price alerts enabled, are ignored.
    pub fn new(
        markets: Vec<MarketCalendar>,
        symbols: Vec<MonitoredSymbol>,
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
        cooldowns: CooldownConfig,
    ) -> Self {
        let symbols: Vec<MonitoredSymbol> = symbols
            .into_iter()
            .filter(|s| s.is_enabled(AlertKind::Price))
            .filter(|s| markets.iter().any(|m| m.id() == s.market))
            .collect();
        let references = markets
            .iter()
            .map(|m| (m.id().to_string(), ReferencePriceCache::new()))
            .collect();

        telemetry::set_gauge(GaugeMetric::MonitoredSymbols, symbols.len() as f64);

        Self {
            markets,
            symbols,
            provider,
            notifier,
            references,
            cooldowns: AlertCooldownTracker::new(cooldowns),
            evaluator: ThresholdEvaluator::new(),
            scheduler: PollingScheduler::default(),
            classifier: Box::new(ThresholdShareClassifier::default()),
            settings: LoopSettings::default(),
            state: RwLock::new(MonitorState::Idle),
            clock: Arc::new(Utc::now),
        }
    }

    /// Loop over `markets` with every tunable taken from `config`
    pub fn from_config(
        config: &Config,
        markets: Vec<MarketCalendar>,
        provider: Arc<dyn MarketDataProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(
            markets,
            config.monitored_symbols(),
            provider,
            notifier,
            config.monitor.cooldowns.clone(),
        )
        .with_scheduler(PollingScheduler::from(config))
        .with_settings(LoopSettings::from(config))
        .with_classifier(ThresholdShareClassifier::from(&config.monitor.volatility))
    }

    pub fn with_scheduler(mut self, scheduler: PollingScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_classifier(mut self, classifier: impl VolatilityClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Current phase
    pub async fn state(&self) -> MonitorState {
        *self.state.read().await
    }

    async fn set_state(&self, state: MonitorState) {
        *self.state.write().await = state;
    }

    pub fn markets(&self) -> &[MarketCalendar] {
        &self.markets
    }

    pub fn symbols(&self) -> &[MonitoredSymbol] {
        &self.symbols
    }

    /// Reference cache for one market
    pub fn reference_cache(&self, market: &str) -> Option<&ReferencePriceCache> {
        self.references.get(market)
    }

    /// Run one cycle at the clock's current time
    pub async fn run_once(&self) -> CycleReport {
        self.run_cycle((self.clock)()).await
    }

    /// Run one full cycle at `now` and return what happened.
    ///
    /// Per-symbol failures are recorded in the report; nothing here aborts
    /// the cycle.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(now);

        self.set_state(MonitorState::CheckingMarket).await;
        let open = open_markets(&self.markets, now);
        report.open_markets = open.iter().map(|m| m.id().to_string()).collect();
        telemetry::set_gauge(GaugeMetric::OpenMarkets, open.len() as f64);

        if open.is_empty() {
            tracing::debug!(%now, "All monitored markets closed");
            report.next_delay = self.scheduler.next_delay(false, VolatilityLevel::Normal);
            self.set_state(MonitorState::Waiting).await;
            return report;
        }

        let active: Vec<(&MonitoredSymbol, &MarketCalendar)> = self
            .symbols
            .iter()
            .filter_map(|s| open.iter().find(|m| m.id() == s.market).map(|m| (s, *m)))
            .collect();

        self.set_state(MonitorState::RefreshingReferences).await;
        self.refresh_references(&open, &active, now, &mut report).await;

        self.set_state(MonitorState::Polling).await;
        let prices = self.poll_prices(&active, &mut report).await;

        self.set_state(MonitorState::Evaluating).await;
        let (pending, moves) = self.evaluate(&active, &prices, now, &mut report).await;

        if !pending.is_empty() {
            self.set_state(MonitorState::Dispatching).await;
            self.dispatch(pending, now, &mut report).await;
        }

        self.cooldowns.prune_expired(now).await;
        telemetry::set_gauge(
            GaugeMetric::CooldownEntries,
            self.cooldowns.len().await as f64,
        );

        report.volatility = self.classifier.classify(&moves);
        report.next_delay = self.scheduler.next_delay(true, report.volatility);
        telemetry::record_latency(LatencyMetric::Cycle, started.elapsed());

        self.set_state(MonitorState::Waiting).await;
        report
    }

    async fn refresh_references(
        &self,
        open: &[&MarketCalendar],
        active: &[(&MonitoredSymbol, &MarketCalendar)],
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        for market in open {
            let Some(cache) = self.references.get(market.id()) else {
                continue;
            };
            let symbols: Vec<String> = active
                .iter()
                .filter(|(_, m)| m.id() == market.id())
                .map(|(s, _)| s.symbol.clone())
                .collect();
            if symbols.is_empty() {
                continue;
            }

            let summary = cache
                .ensure_fresh(
                    self.provider.as_ref(),
                    &symbols,
                    market.local_date(now),
                    self.settings.request_timeout,
                    self.settings.max_concurrent_fetches,
                )
                .await;
            if !summary.skipped {
                tracing::info!(
                    market = market.id(),
                    refreshed = summary.refreshed,
                    failed = summary.failed.len(),
                    "Reference prices refreshed"
                );
            }
            report.provider_failures.extend(summary.failed);
        }
    }

    async fn poll_prices(
        &self,
        active: &[(&MonitoredSymbol, &MarketCalendar)],
        report: &mut CycleReport,
    ) -> HashMap<String, PriceObservation> {
        let tickers: Vec<String> = active.iter().map(|(s, _)| s.symbol.clone()).collect();
        report.symbols_polled = tickers.len();

        let provider = self.provider.as_ref();
        let results = fetch_all(
            &tickers,
            self.settings.max_concurrent_fetches,
            self.settings.request_timeout,
            |symbol| async move { provider.current_price(&symbol).await },
        )
        .await;

        let mut prices = HashMap::with_capacity(results.len());
        for (symbol, result) in results {
            match result {
                Ok(observation) => {
                    prices.insert(symbol, observation);
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Price fetch failed");
                    report.provider_failures.push(symbol);
                }
            }
        }
        report.provider_failures.sort();
        report.provider_failures.dedup();
        prices
    }

    /// Evaluate every priced symbol; returns alerts that passed the cooldown gate
    async fn evaluate(
        &self,
        active: &[(&MonitoredSymbol, &MarketCalendar)],
        prices: &HashMap<String, PriceObservation>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> (Vec<AlertRecord>, Vec<SymbolMove>) {
        let mut pending = Vec::new();
        let mut moves = Vec::new();

        for (symbol, market) in active {
            let Some(observation) = prices.get(&symbol.symbol) else {
                continue;
            };

            let today = market.local_date(now);
            let reference = match self.references.get(market.id()) {
                Some(cache) => cache.get_fresh(&symbol.symbol, today).await,
                None => None,
            };
            let Some(reference) = reference else {
                tracing::debug!(symbol = %symbol.symbol, %today, "No reference price yet");
                report.missing_reference.push(symbol.symbol.clone());
                continue;
            };

            let evaluation = match self.evaluator.evaluate(
                &symbol.symbol,
                observation.price,
                reference,
                &symbol.conditions,
            ) {
                Ok(evaluation) => evaluation,
                Err(guard) => {
                    tracing::warn!(symbol = %symbol.symbol, reason = %guard, "Skipping evaluation");
                    telemetry::increment(CounterMetric::EvaluationGuards);
                    report.guarded.push(symbol.symbol.clone());
                    continue;
                }
            };
            report.symbols_evaluated += 1;

            tracing::debug!(
                symbol = %symbol.symbol,
                price = %observation.price,
                reference = %reference,
                change = %evaluation.percent_change.round_dp(2),
                triggered = evaluation.triggered.len(),
                "Evaluated"
            );

            moves.push(SymbolMove {
                symbol: symbol.symbol.clone(),
                percent_change: evaluation.percent_change,
                min_threshold: symbol.min_threshold(),
            });

            let Some(triggered) = evaluation.strongest() else {
                continue;
            };

            if !self
                .cooldowns
                .should_send(&symbol.symbol, AlertKind::Price, now)
                .await
            {
                tracing::debug!(symbol = %symbol.symbol, "Alert suppressed by cooldown");
                telemetry::increment(CounterMetric::AlertsSuppressed);
                report.alerts_suppressed += 1;
                continue;
            }

            let company = CompanyInfo {
                name: symbol.name.clone(),
                market: market.id().to_string(),
                exchange: market.exchange().to_string(),
                currency: market.currency().to_string(),
            };
            pending.push(AlertRecord::price_alert(
                symbol,
                company,
                observation,
                reference,
                triggered,
                now,
            ));
        }

        (pending, moves)
    }

    async fn dispatch(&self, pending: Vec<AlertRecord>, now: DateTime<Utc>, report: &mut CycleReport) {
        let record_first = self.settings.record_cooldown_on_failure;

        for alert in pending {
            // Recorded before sending so an abort mid-dispatch cannot leave a
            // delivered alert without its cooldown
            if record_first {
                self.cooldowns.record_sent(&alert.symbol, alert.kind, now).await;
            }

            let outcome = self.notifier.notify(&alert).await;

            if outcome.is_failure() {
                tracing::error!(
                    symbol = %alert.symbol,
                    channels = outcome.failed.len(),
                    "Alert not delivered on any channel"
                );
                telemetry::increment(CounterMetric::AlertsFailed);
                report.alerts_failed += 1;
                continue;
            }

            tracing::info!(
                alert_id = %alert.id,
                symbol = %alert.symbol,
                change = %alert.percent_change.round_dp(2),
                threshold = %alert.condition.threshold_percent,
                channels = ?outcome.delivered,
                "Alert dispatched"
            );
            telemetry::increment(CounterMetric::AlertsDispatched);
            report.alerts_dispatched += 1;

            if !record_first {
                self.cooldowns.record_sent(&alert.symbol, alert.kind, now).await;
            }
        }
    }

    fn recover(&self, err: CycleError) -> Duration {
        tracing::error!(error = %err, delay_secs = self.settings.recovery_delay.as_secs(), "Cycle failed");
        telemetry::increment(CounterMetric::CycleErrors);
        self.settings.recovery_delay
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped.
    ///
    /// Shutdown aborts the cycle in flight, so no alerts are built from a
    /// partial snapshot.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            markets = ?self.markets.iter().map(|m| m.id()).collect::<Vec<_>>(),
            symbols = self.symbols.len(),
            "Monitor loop starting"
        );

        loop {
            let now = (self.clock)();
            let this = Arc::clone(&self);
            let cycle = tokio::spawn(async move { this.run_cycle(now).await });
            let abort = cycle.abort_handle();

            let delay = tokio::select! {
                joined = tokio::time::timeout(self.settings.cycle_timeout, cycle) => match joined {
                    Ok(Ok(report)) => {
                        report.log();
                        report.next_delay
                    }
                    Ok(Err(e)) => self.recover(CycleError::from(e)),
                    Err(_) => {
                        abort.abort();
                        self.recover(CycleError::TimedOut(self.settings.cycle_timeout))
                    }
                },
                _ = shutdown.wait_for(|stop| *stop) => {
                    abort.abort();
                    break;
                }
            };

            self.set_state(MonitorState::Waiting).await;
            tracing::debug!(delay_secs = delay.as_secs(), "Waiting for next cycle");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        self.set_state(MonitorState::Stopped).await;
        tracing::info!("Monitor loop stopped");
    }
}
