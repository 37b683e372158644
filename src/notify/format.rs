//! Alert message templates

use super::FormattedAlert;
use crate::alert::AlertRecord;
use crate::config::AlertFormatConfig;
use rust_decimal::Decimal;

/// Renders alert records through `{placeholder}` templates
#[derive(Debug, Clone)]
pub struct AlertFormatter {
    subject: String,
    body: String,
}

impl Default for AlertFormatter {
    fn default() -> Self {
        Self::from(&AlertFormatConfig::default())
    }
}

impl From<&AlertFormatConfig> for AlertFormatter {
    fn from(config: &AlertFormatConfig) -> Self {
        Self {
            subject: config.subject.clone(),
            body: config.price_alert.clone(),
        }
    }
}

fn signed(value: Decimal) -> String {
    let value = value.round_dp(2);
    if value > Decimal::ZERO {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

impl AlertFormatter {
    pub fn format(&self, alert: &AlertRecord) -> FormattedAlert {
        let arrow = if alert.is_up() { "📈" } else { "📉" };
        let values = [
            ("{symbol}", alert.symbol.clone()),
            ("{name}", alert.company.name.clone()),
            ("{market}", alert.company.market.clone()),
            ("{exchange}", alert.company.exchange.clone()),
            ("{currency}", alert.company.currency.clone()),
            ("{price}", format!("{:.2}", alert.price.round_dp(2))),
            ("{reference}", format!("{:.2}", alert.reference_price.round_dp(2))),
            ("{change}", signed(alert.percent_change)),
            ("{threshold}", alert.condition.threshold_percent.normalize().to_string()),
            ("{direction}", alert.condition.direction.as_str().to_string()),
            ("{kind}", alert.kind.to_string()),
            ("{arrow}", arrow.to_string()),
            (
                "{timestamp}",
                alert.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
        ];

        let render = |template: &str| {
            values
                .iter()
                .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
        };

        FormattedAlert {
            symbol: alert.symbol.clone(),
            subject: render(&self.subject),
            body: render(&self.body),
        }
    }
}
