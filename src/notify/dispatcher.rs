//! Fan-out of formatted alerts to every configured channel

use super::{
    AlertFormatter, DispatchError, DispatchOutcome, EmailChannel, LogChannel, NotificationChannel,
    Notifier, SlackChannel, TelegramChannel,
};
use crate::alert::AlertRecord;
use crate::config::{ChannelKind, Config};
use crate::telemetry::{self, LatencyMetric};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use std::time::{Duration, Instant};

/// Timeout for a single channel send
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Formats each alert once and sends it to all channels concurrently
pub struct Dispatcher {
    formatter: AlertFormatter,
    channels: Vec<NotificationChannel>,
}

impl Dispatcher {
    pub fn new(formatter: AlertFormatter, channels: Vec<NotificationChannel>) -> Self {
        Self {
            formatter,
            channels,
        }
    }

    /// Channels from the `notifications` section. Disabled notifications fall
    /// back to the log channel so alerts are never silently dropped.
    pub fn from_config(config: &Config) -> Result<Self, DispatchError> {
        let formatter = AlertFormatter::from(&config.alert_format);
        let notifications = &config.notifications;

        if !notifications.enabled || notifications.channels.is_empty() {
            tracing::info!("Notifications disabled, alerts go to the log only");
            return Ok(Self::log_only(formatter));
        }

        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        let mut channels = Vec::with_capacity(notifications.channels.len());
        for kind in &notifications.channels {
            // Missing tables are rejected by Config::validate
            let channel = match kind {
                ChannelKind::Log => Some(NotificationChannel::Log(LogChannel)),
                ChannelKind::Email => notifications
                    .email
                    .as_ref()
                    .map(|c| NotificationChannel::Email(EmailChannel::new(client.clone(), c))),
                ChannelKind::Slack => notifications
                    .slack
                    .as_ref()
                    .map(|c| NotificationChannel::Slack(SlackChannel::new(client.clone(), c))),
                ChannelKind::Telegram => notifications.telegram.as_ref().map(|c| {
                    NotificationChannel::Telegram(TelegramChannel::new(client.clone(), c))
                }),
            };
            channels.extend(channel);
        }

        tracing::info!(
            channels = ?channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "Notification channels ready"
        );
        Ok(Self::new(formatter, channels))
    }

    /// Dispatcher that only writes to the log
    pub fn log_only(formatter: AlertFormatter) -> Self {
        Self::new(formatter, vec![NotificationChannel::Log(LogChannel)])
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    async fn notify(&self, alert: &AlertRecord) -> DispatchOutcome {
        let started = Instant::now();
        let formatted = self.formatter.format(alert);

        let results = join_all(self.channels.iter().map(|channel| {
            let formatted = &formatted;
            async move { (channel.name(), channel.send(formatted).await) }
        }))
        .await;

        let mut outcome = DispatchOutcome::default();
        for (name, result) in results {
            match result {
                Ok(()) => outcome.delivered.push(name),
                Err(e) => {
                    tracing::warn!(
                        channel = name,
                        symbol = %alert.symbol,
                        error = %e,
                        "Alert delivery failed"
                    );
                    telemetry::record_channel_failure(name);
                    outcome.failed.push((name, e));
                }
            }
        }

        telemetry::record_latency(LatencyMetric::Dispatch, started.elapsed());
        outcome
    }
}
