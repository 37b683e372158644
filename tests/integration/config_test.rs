//! Integration tests for configuration loading

use price_sentinel::config::{ChannelKind, Config, ConfigError};
use price_sentinel::symbol::{AlertKind, Direction};
use rust_decimal_macros::dec;
use std::io::Write;

const EXAMPLE: &str = include_str!("../../config.toml.example");

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_example_config_loads() {
    let file = write_config(EXAMPLE);
    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.markets.len(), 2);
    assert_eq!(config.markets["us"].currency, "USD");
    assert_eq!(config.markets["swedish"].exchange, "OMX Stockholm");
    assert_eq!(config.notifications.channels, vec![ChannelKind::Log, ChannelKind::Slack]);

    let calendars = config.market_calendars().unwrap();
    let ids: Vec<_> = calendars.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["swedish", "us"]);

    let symbols = config.monitored_symbols();
    let volvo = symbols.iter().find(|s| s.symbol == "VOLV-B.ST").unwrap();
    assert_eq!(volvo.market, "swedish");
    assert!(volvo.is_enabled(AlertKind::Price));
    assert!(volvo.is_enabled(AlertKind::News));
    assert_eq!(volvo.min_threshold(), Some(dec!(3)));
    assert!(volvo
        .conditions
        .iter()
        .any(|c| c.direction == Direction::Down));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("[markets.us\nexchange = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_zero_delay_rejected() {
    let content = format!("{EXAMPLE}\n").replace("closed_delay_secs = 300", "closed_delay_secs = 0");
    let file = write_config(&content);
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_holidays_close_the_market() {
    let file = write_config(EXAMPLE);
    let config = Config::load(file.path()).unwrap();
    let calendars = config.market_calendars().unwrap();
    let swedish = calendars.iter().find(|c| c.id() == "swedish").unwrap();

    // Friday 2025-06-06 is Sweden's national day
    let national_day = chrono::NaiveDate::from_ymd_opt(2025, 6, 6).unwrap();
    assert!(!swedish.is_trading_day(national_day));
    assert!(swedish.is_trading_day(national_day + chrono::Days::new(3)));
}
