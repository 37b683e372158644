//! Chat channels: Slack incoming webhooks and Telegram bots

use super::{DispatchError, FormattedAlert};
use crate::config::{resolve_secret, SlackConfig, TelegramConfig};
use reqwest::{Client, Response};
use serde_json::json;

async fn check_response(channel: &'static str, response: Response) -> Result<(), DispatchError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(DispatchError::Rejected {
        channel,
        status,
        body,
    })
}

/// Posts alerts to a Slack incoming webhook
pub struct SlackChannel {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackChannel {
    pub fn new(client: Client, config: &SlackConfig) -> Self {
        let webhook_url = resolve_secret(
            config.webhook_url.as_deref(),
            config.webhook_url_env.as_deref(),
        );
        if webhook_url.is_none() {
            tracing::warn!("Slack channel has no webhook URL; sends will fail");
        }
        Self {
            client,
            webhook_url,
        }
    }

    pub async fn send(&self, alert: &FormattedAlert) -> Result<(), DispatchError> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or_else(|| DispatchError::MissingCredential {
                channel: "slack",
                detail: "webhook_url or webhook_url_env".to_string(),
            })?;

        let payload = json!({ "text": format!("*{}*\n{}", alert.subject, alert.body) });
        let response = self.client.post(url).json(&payload).send().await?;
        check_response("slack", response).await?;

        tracing::debug!(symbol = %alert.symbol, "Slack alert sent");
        Ok(())
    }
}

/// Sends alerts through a Telegram bot
pub struct TelegramChannel {
    client: Client,
    api_url: String,
    bot_token: Option<String>,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(client: Client, config: &TelegramConfig) -> Self {
        let bot_token =
            resolve_secret(config.bot_token.as_deref(), config.bot_token_env.as_deref());
        if bot_token.is_none() {
            tracing::warn!("Telegram channel has no bot token; sends will fail");
        }
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id: config.chat_id.clone(),
        }
    }

    pub async fn send(&self, alert: &FormattedAlert) -> Result<(), DispatchError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| DispatchError::MissingCredential {
                channel: "telegram",
                detail: "bot_token or bot_token_env".to_string(),
            })?;

        let url = format!("{}/bot{}/sendMessage", self.api_url, token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": format!("{}\n\n{}", alert.subject, alert.body),
            "disable_web_page_preview": true
        });

        // The request URL embeds the bot token; keep it out of errors and logs
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::Http(e.without_url()))?;
        check_response("telegram", response).await?;

        tracing::debug!(symbol = %alert.symbol, "Telegram alert sent");
        Ok(())
    }
}
