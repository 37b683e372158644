//! Configuration types for price-sentinel

use crate::market::MarketCalendar;
use crate::symbol::{AlertKind, MonitoredSymbol, PriceCondition};
use crate::telemetry::LogFormat;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Fatal at startup; the monitor never starts on one.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Config parsed but its content is inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub markets: BTreeMap<String, MarketConfig>,
    #[serde(default)]
    pub companies: BTreeMap<String, Vec<CompanyConfig>>,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub alert_format: AlertFormatConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Global settings
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Steady-state poll delay in seconds while markets are open
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    /// Display timezone label
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_update_interval() -> u64 {
    180
}
fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
            timezone: default_timezone(),
        }
    }
}

/// Exchange and trading calendar for one market
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    pub exchange: String,
    pub currency: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Offset of exchange local time from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub market_hours: MarketHoursConfig,
    /// Full-day closures as "YYYY-MM-DD" strings
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketHoursConfig {
    pub regular: TradingSession,
}

/// Session bounds as "HH:MM" in exchange local time
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSession {
    pub start: String,
    pub end: String,
}

/// One monitored company
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyConfig {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub price_alerts: PriceAlertConfig,
    #[serde(default)]
    pub news_alerts: NewsAlertConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceAlertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<PriceCondition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsAlertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Notification channel selector
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Log,
    Email,
    Slack,
    Telegram,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub channels: Vec<ChannelKind>,
    pub email: Option<EmailConfig>,
    pub slack: Option<SlackConfig>,
    pub telegram: Option<TelegramConfig>,
}

/// Email delivered through an HTTP mail relay
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub api_key_env: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
    pub webhook_url_env: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub bot_token_env: Option<String>,
    pub chat_id: String,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Message templates
#[derive(Debug, Clone, Deserialize)]
pub struct AlertFormatConfig {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_price_alert")]
    pub price_alert: String,
}

fn default_subject() -> String {
    "{arrow} {symbol} {change}%".to_string()
}
fn default_price_alert() -> String {
    "{arrow} {name} ({symbol}, {exchange}) moved {change}% to {price} {currency} \
     (previous close {reference}, threshold {threshold}% {direction}) at {timestamp}"
        .to_string()
}

impl Default for AlertFormatConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            price_alert: default_price_alert(),
        }
    }
}

/// Monitor loop tuning
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Delay while every monitored market is closed (seconds)
    #[serde(default = "default_closed_delay")]
    pub closed_delay_secs: u64,

    /// Delay while open markets are volatile (seconds)
    #[serde(default = "default_volatile_delay")]
    pub volatile_delay_secs: u64,

    /// Delay after a failed cycle (seconds)
    #[serde(default = "default_recovery_delay")]
    pub recovery_delay_secs: u64,

    /// Timeout for a single provider request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Cap on one full cycle (seconds)
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,

    /// Maximum provider requests in flight per cycle
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Consume the cooldown window even when every channel failed
    #[serde(default = "default_true")]
    pub record_cooldown_on_failure: bool,

    #[serde(default)]
    pub cooldowns: CooldownConfig,

    #[serde(default)]
    pub volatility: VolatilityConfig,
}

fn default_true() -> bool {
    true
}
fn default_closed_delay() -> u64 {
    300
}
fn default_volatile_delay() -> u64 {
    60
}
fn default_recovery_delay() -> u64 {
    60
}
fn default_request_timeout() -> u64 {
    10
}
fn default_cycle_timeout() -> u64 {
    120
}
fn default_max_concurrent_fetches() -> usize {
    4
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            closed_delay_secs: 300,
            volatile_delay_secs: 60,
            recovery_delay_secs: 60,
            request_timeout_secs: 10,
            cycle_timeout_secs: 120,
            max_concurrent_fetches: 4,
            record_cooldown_on_failure: true,
            cooldowns: CooldownConfig::default(),
            volatility: VolatilityConfig::default(),
        }
    }
}

/// Cooldown window per alert kind
#[derive(Debug, Clone, Deserialize)]
pub struct CooldownConfig {
    #[serde(default = "default_price_cooldown")]
    pub price_secs: u64,
    #[serde(default = "default_news_cooldown")]
    pub news_secs: u64,
}

fn default_price_cooldown() -> u64 {
    900
}
fn default_news_cooldown() -> u64 {
    1800
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            price_secs: 900,
            news_secs: 1800,
        }
    }
}

impl CooldownConfig {
    pub fn window(&self, kind: AlertKind) -> Duration {
        match kind {
            AlertKind::Price => Duration::from_secs(self.price_secs),
            AlertKind::News => Duration::from_secs(self.news_secs),
        }
    }
}

/// Volatility classification thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct VolatilityConfig {
    /// Fraction of a symbol's smallest threshold that counts as a large move
    #[serde(default = "default_move_fraction")]
    pub move_fraction: Decimal,

    /// Share of evaluated symbols that must move for the cycle to be volatile
    #[serde(default = "default_symbol_share")]
    pub symbol_share: Decimal,
}

fn default_move_fraction() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_symbol_share() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            move_fraction: Decimal::new(5, 1),
            symbol_share: Decimal::new(25, 2),
        }
    }
}

/// Market-data provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    /// Intraday bar interval used for the current price
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_provider_url() -> String {
    "https://www.alphavantage.co".to_string()
}
fn default_api_key_env() -> Option<String> {
    Some("ALPHAVANTAGE_API_KEY".to_string())
}
fn default_interval() -> String {
    "1min".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            interval: default_interval(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Resolve a secret given inline or by environment variable name
pub fn resolve_secret(inline: Option<&str>, env_name: Option<&str>) -> Option<String> {
    if let Some(value) = inline.filter(|v| !v.is_empty()) {
        return Some(value.to_string());
    }
    env_name
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-section consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markets.is_empty() {
            return Err(invalid("no markets configured"));
        }

        // Calendar construction checks trading hours and offsets
        self.market_calendars()?;

        for (market, companies) in &self.companies {
            if !self.markets.contains_key(market) {
                return Err(invalid(format!(
                    "companies reference unknown market '{market}'"
                )));
            }

            let mut seen = HashSet::new();
            for company in companies {
                if company.symbol.trim().is_empty() {
                    return Err(invalid(format!("empty symbol in market '{market}'")));
                }
                if !seen.insert(company.symbol.as_str()) {
                    return Err(invalid(format!(
                        "duplicate symbol '{}' in market '{market}'",
                        company.symbol
                    )));
                }
                if company.price_alerts.enabled && company.price_alerts.conditions.is_empty() {
                    return Err(invalid(format!(
                        "price alerts enabled for '{}' without conditions",
                        company.symbol
                    )));
                }
                if let Some(c) = company
                    .price_alerts
                    .conditions
                    .iter()
                    .find(|c| c.threshold_percent <= Decimal::ZERO)
                {
                    return Err(invalid(format!(
                        "threshold {} for '{}' must be positive",
                        c.threshold_percent, company.symbol
                    )));
                }
            }
        }

        let m = &self.monitor;
        if self.global.update_interval == 0
            || m.closed_delay_secs == 0
            || m.volatile_delay_secs == 0
            || m.recovery_delay_secs == 0
        {
            return Err(invalid("poll delays must be greater than zero"));
        }
        if m.request_timeout_secs == 0 || m.cycle_timeout_secs == 0 {
            return Err(invalid("timeouts must be greater than zero"));
        }
        if m.max_concurrent_fetches == 0 {
            return Err(invalid("max_concurrent_fetches must be at least 1"));
        }
        if m.volatility.move_fraction <= Decimal::ZERO
            || m.volatility.symbol_share <= Decimal::ZERO
            || m.volatility.symbol_share > Decimal::ONE
        {
            return Err(invalid(
                "volatility.move_fraction must be positive and symbol_share in (0, 1]",
            ));
        }

        if self.notifications.enabled {
            for channel in &self.notifications.channels {
                let present = match channel {
                    ChannelKind::Log => true,
                    ChannelKind::Email => self.notifications.email.is_some(),
                    ChannelKind::Slack => self.notifications.slack.is_some(),
                    ChannelKind::Telegram => self.notifications.telegram.is_some(),
                };
                if !present {
                    return Err(invalid(format!(
                        "channel {channel:?} enabled without its settings table"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Trading calendars for every configured market, ordered by market id
    pub fn market_calendars(&self) -> Result<Vec<MarketCalendar>, ConfigError> {
        self.markets
            .iter()
            .map(|(id, market)| MarketCalendar::from_config(id, market))
            .collect()
    }

    /// Every configured company as a monitored symbol
    pub fn monitored_symbols(&self) -> Vec<MonitoredSymbol> {
        self.companies
            .iter()
            .flat_map(|(market, companies)| {
                companies
                    .iter()
                    .map(move |company| MonitoredSymbol::from_company(market, company))
            })
            .collect()
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Direction;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
        [markets.us]
        exchange = "NASDAQ"
        currency = "USD"
        utc_offset_minutes = -240

        [markets.us.market_hours.regular]
        start = "09:30"
        end = "16:00"

        [[companies.us]]
        symbol = "AAPL"
        name = "Apple Inc."

        [companies.us.price_alerts]
        enabled = true

        [[companies.us.price_alerts.conditions]]
        comparison = "previous_close"
        threshold_percent = 5.0
        direction = "up"
    "#;

    #[test]
    fn test_config_deserialize_minimal() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.markets["us"].exchange, "NASDAQ");
        assert_eq!(config.global.update_interval, 180);
        assert_eq!(config.monitor.closed_delay_secs, 300);
        assert_eq!(config.monitor.cooldowns.price_secs, 900);
        assert!(config.monitor.record_cooldown_on_failure);
        assert!(!config.notifications.enabled);

        let symbols = config.monitored_symbols();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].market, "us");
        assert_eq!(symbols[0].conditions[0].threshold_percent, dec!(5.0));
        assert_eq!(symbols[0].conditions[0].direction, Direction::Up);
    }

    #[test]
    fn test_unknown_market_rejected() {
        let toml = MINIMAL.replace("[[companies.us]]", "[[companies.swedish]]").replace(
            "[companies.us.price_alerts]",
            "[companies.swedish.price_alerts]",
        ).replace(
            "[[companies.us.price_alerts.conditions]]",
            "[[companies.swedish.price_alerts.conditions]]",
        );
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_trading_hours_rejected() {
        let toml = MINIMAL.replace("\"09:30\"", "\"9h30\"");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_comparison_is_parse_error() {
        let toml = MINIMAL.replace("previous_close", "moving_average");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_enabled_channel_requires_settings() {
        let toml = format!(
            "{MINIMAL}\n[notifications]\nenabled = true\nchannels = [\"slack\"]\n"
        );
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let toml = format!(
            "{MINIMAL}\n[[companies.us]]\nsymbol = \"AAPL\"\nname = \"Again\"\n"
        );
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let toml = MINIMAL.replace("threshold_percent = 5.0", "threshold_percent = 0.0");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let toml = MINIMAL.replace("threshold_percent = 5.0", "threshold_percent = -2.0");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_cooldown_window_per_kind() {
        let cooldowns = CooldownConfig::default();
        assert_eq!(cooldowns.window(AlertKind::Price), Duration::from_secs(900));
        assert_eq!(cooldowns.window(AlertKind::News), Duration::from_secs(1800));
    }

    #[test]
    fn test_resolve_secret_prefers_inline() {
        assert_eq!(
            resolve_secret(Some("inline"), Some("PRICE_SENTINEL_UNSET_VAR")),
            Some("inline".to_string())
        );
        assert_eq!(resolve_secret(Some(""), Some("PRICE_SENTINEL_UNSET_VAR")), None);
    }
}
