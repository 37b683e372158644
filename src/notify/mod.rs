//! Notification module
//!
//! Formats alert records and delivers them over configured channels

mod channel;
mod chat;
mod dispatcher;
mod email;
mod format;
mod types;

pub use channel::{LogChannel, NotificationChannel};
pub use chat::{SlackChannel, TelegramChannel};
pub use dispatcher::Dispatcher;
pub use email::EmailChannel;
pub use format::AlertFormatter;
pub use types::{DispatchError, DispatchOutcome, FormattedAlert};

use crate::alert::AlertRecord;
use async_trait::async_trait;

/// Trait for alert delivery implementations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one alert; failures are reported in the outcome, never raised
    async fn notify(&self, alert: &AlertRecord) -> DispatchOutcome;
}
