//! Notification channel variants

use super::{DispatchError, EmailChannel, FormattedAlert, SlackChannel, TelegramChannel};

/// Writes alerts to the structured log
#[derive(Debug, Clone, Default)]
pub struct LogChannel;

impl LogChannel {
    pub fn send(&self, alert: &FormattedAlert) {
        tracing::info!(
            target: "price_sentinel::alerts",
            symbol = %alert.symbol,
            subject = %alert.subject,
            "{}",
            alert.body
        );
    }
}

/// A delivery channel selected by configuration
pub enum NotificationChannel {
    Log(LogChannel),
    Email(EmailChannel),
    Slack(SlackChannel),
    Telegram(TelegramChannel),
}

impl NotificationChannel {
    pub fn name(&self) -> &'static str {
        match self {
            NotificationChannel::Log(_) => "log",
            NotificationChannel::Email(_) => "email",
            NotificationChannel::Slack(_) => "slack",
            NotificationChannel::Telegram(_) => "telegram",
        }
    }

    /// Send one formatted alert
    pub async fn send(&self, alert: &FormattedAlert) -> Result<(), DispatchError> {
        match self {
            NotificationChannel::Log(channel) => {
                channel.send(alert);
                Ok(())
            }
            NotificationChannel::Email(channel) => channel.send(alert).await,
            NotificationChannel::Slack(channel) => channel.send(alert).await,
            NotificationChannel::Telegram(channel) => channel.send(alert).await,
        }
    }
}
