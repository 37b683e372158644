//! price-sentinel: equity price-movement monitor
//!
//! This library provides the core components for:
//! - Market calendars deciding which exchanges are trading
//! - Previous-close reference prices from Alpha Vantage
//! - Threshold evaluation of intraday moves
//! - Per-symbol alert cooldowns
//! - Adaptive poll cadence
//! - Alert delivery over log, email, Slack and Telegram
//! - Structured logging and Prometheus metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod market;
pub mod monitor;
pub mod notify;
pub mod provider;
pub mod symbol;
pub mod telemetry;
