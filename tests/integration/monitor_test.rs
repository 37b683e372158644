//! Integration tests for the monitor loop

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use price_sentinel::alert::AlertRecord;
use price_sentinel::config::{Config, CooldownConfig};
use price_sentinel::market::MarketCalendar;
use price_sentinel::monitor::{MonitorLoop, MonitorState};
use price_sentinel::notify::{DispatchOutcome, Notifier};
use price_sentinel::provider::{MarketDataProvider, PriceObservation, ProviderError};
use price_sentinel::symbol::{Direction, MonitoredSymbol, PriceCondition};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Fixed quotes keyed by symbol
struct QuoteBoard {
    quotes: HashMap<String, (Decimal, Decimal)>,
    calls: AtomicUsize,
}

impl QuoteBoard {
    fn new(quotes: &[(&str, Decimal, Decimal)]) -> Self {
        Self {
            quotes: quotes
                .iter()
                .map(|(s, close, price)| (s.to_string(), (*close, *price)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn lookup(&self, symbol: &str) -> Result<(Decimal, Decimal), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quotes.get(symbol).copied().ok_or_else(|| ProviderError::NoData {
            symbol: symbol.to_string(),
            detail: "unknown symbol".to_string(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for QuoteBoard {
    async fn current_price(&self, symbol: &str) -> Result<PriceObservation, ProviderError> {
        let (_, price) = self.lookup(symbol)?;
        Ok(PriceObservation::new(symbol, price))
    }

    async fn previous_close(&self, symbol: &str, _date: NaiveDate) -> Result<Decimal, ProviderError> {
        let (close, _) = self.lookup(symbol)?;
        Ok(close)
    }
}

#[derive(Default)]
struct Inbox {
    alerts: Mutex<Vec<AlertRecord>>,
}

#[async_trait]
impl Notifier for Inbox {
    async fn notify(&self, alert: &AlertRecord) -> DispatchOutcome {
        self.alerts.lock().unwrap().push(alert.clone());
        DispatchOutcome {
            delivered: vec!["inbox"],
            failed: Vec::new(),
        }
    }
}

fn market(id: &str, offset_hours: i32, open: (u32, u32), close: (u32, u32)) -> MarketCalendar {
    MarketCalendar::new(
        id,
        FixedOffset::east_opt(offset_hours * 3600).unwrap(),
        NaiveTime::from_hms_opt(open.0, open.1, 0).unwrap(),
        NaiveTime::from_hms_opt(close.0, close.1, 0).unwrap(),
    )
}

fn up_five(ticker: &str, market: &str) -> MonitoredSymbol {
    MonitoredSymbol::with_price_alerts(
        ticker,
        ticker,
        market,
        vec![PriceCondition::new(dec!(5), Direction::Up)],
    )
}

/// Wednesday 2025-06-11 at the given UTC time
fn wednesday(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 11, hour, minute, 0).unwrap()
}

#[tokio::test]
async fn test_only_open_market_is_polled() {
    // 18:00 UTC: New York (UTC-4) is open, Stockholm (UTC+2) closed at 17:30 local
    let provider = Arc::new(QuoteBoard::new(&[
        ("XYZ", dec!(100.00), dec!(106.00)),
        ("VOLV-B.ST", dec!(250), dec!(300)),
    ]));
    let inbox = Arc::new(Inbox::default());
    let monitor = MonitorLoop::new(
        vec![
            market("us", -4, (9, 30), (16, 0)),
            market("swedish", 2, (9, 0), (17, 30)),
        ],
        vec![up_five("XYZ", "us"), up_five("VOLV-B.ST", "swedish")],
        provider.clone(),
        inbox.clone(),
        CooldownConfig::default(),
    );

    let report = monitor.run_cycle(wednesday(18, 0)).await;

    assert_eq!(report.open_markets, vec!["us".to_string()]);
    assert_eq!(report.symbols_polled, 1);
    // One previous close plus one current price
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    let alerts = inbox.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].symbol, "XYZ");
    assert_eq!(alerts[0].percent_change, dec!(6.00));
    assert_eq!(alerts[0].company.market, "us");
}

#[tokio::test]
async fn test_config_driven_cycle() {
    let config = Config::from_toml_str(
        r#"
        [global]
        update_interval = 120

        [markets.us]
        exchange = "NASDAQ"
        currency = "USD"
        utc_offset_minutes = -240
        market_hours.regular = { start = "09:30", end = "16:00" }

        [[companies.us]]
        symbol = "XYZ"
        name = "XYZ Corp"
        price_alerts.enabled = true
        price_alerts.conditions = [
            { comparison = "previous_close", threshold_percent = 5.0, direction = "up" },
        ]
        "#,
    )
    .unwrap();

    let provider = Arc::new(QuoteBoard::new(&[("XYZ", dec!(100), dec!(101))]));
    let inbox = Arc::new(Inbox::default());
    let monitor = MonitorLoop::from_config(
        &config,
        config.market_calendars().unwrap(),
        provider,
        inbox.clone(),
    );

    let report = monitor.run_cycle(wednesday(15, 0)).await;

    assert!(report.markets_open());
    assert_eq!(report.symbols_evaluated, 1);
    assert_eq!(report.next_delay, Duration::from_secs(120));
    assert!(inbox.alerts.lock().unwrap().is_empty());
    assert_eq!(monitor.state().await, MonitorState::Waiting);
}

#[tokio::test]
async fn test_holiday_counts_as_closed() {
    let provider = Arc::new(QuoteBoard::new(&[("XYZ", dec!(100), dec!(110))]));
    let inbox = Arc::new(Inbox::default());
    let holiday = NaiveDate::from_ymd_opt(2025, 6, 11).unwrap();
    let monitor = MonitorLoop::new(
        vec![market("us", -4, (9, 30), (16, 0)).with_holidays([holiday])],
        vec![up_five("XYZ", "us")],
        provider.clone(),
        inbox,
        CooldownConfig::default(),
    );

    let report = monitor.run_cycle(wednesday(15, 0)).await;

    assert!(!report.markets_open());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_closed_loop_idles_without_provider_calls() {
    let provider = Arc::new(QuoteBoard::new(&[("XYZ", dec!(100), dec!(110))]));
    let inbox = Arc::new(Inbox::default());
    let sunday = Utc.with_ymd_and_hms(2025, 6, 15, 15, 0, 0).unwrap();
    let monitor = Arc::new(
        MonitorLoop::new(
            vec![market("us", -4, (9, 30), (16, 0))],
            vec![up_five("XYZ", "us")],
            provider.clone(),
            inbox.clone(),
            CooldownConfig::default(),
        )
        .with_clock(move || sunday),
    );
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Arc::clone(&monitor).run(rx));
    tokio::time::sleep(Duration::from_secs(3600)).await;

    tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(inbox.alerts.lock().unwrap().is_empty());
    assert_eq!(monitor.state().await, MonitorState::Stopped);
}
