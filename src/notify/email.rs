//! Email over an HTTP mail relay

use super::{DispatchError, FormattedAlert};
use crate::config::{resolve_secret, EmailConfig};
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
}

/// Posts alerts as JSON mail requests to a relay API
pub struct EmailChannel {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    to: Vec<String>,
}

impl EmailChannel {
    pub fn new(client: Client, config: &EmailConfig) -> Self {
        let api_key = resolve_secret(config.api_key.as_deref(), config.api_key_env.as_deref());
        if api_key.is_none() {
            tracing::warn!("Email channel has no API key; sends will fail");
        }

        Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            from: config.from.clone(),
            to: config.to.clone(),
        }
    }

    pub async fn send(&self, alert: &FormattedAlert) -> Result<(), DispatchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DispatchError::MissingCredential {
                channel: "email",
                detail: "api_key or api_key_env".to_string(),
            })?;

        let request = MailRequest {
            from: &self.from,
            to: &self.to,
            subject: &alert.subject,
            text: &alert.body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                channel: "email",
                status,
                body,
            });
        }

        tracing::debug!(symbol = %alert.symbol, recipients = self.to.len(), "Email alert sent");
        Ok(())
    }
}
