//! Generic HTTP webhook channel.

use std::collections::HashMap;

use async_trait::async_trait;
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::ChannelSender;
use renewly_core::types::NotificationChannel;
use serde::Deserialize;

use crate::{REMINDER_TITLE, check_status, parse_config, require};

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_method() -> String {
    "POST".into()
}

pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

pub fn build_payload(channel: &NotificationChannel, message: &str) -> serde_json::Value {
    serde_json::json!({
        "title": REMINDER_TITLE,
        "message": message,
        "channel_id": channel.id,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

pub fn parse_method(method: &str) -> Result<reqwest::Method> {
    match method.trim().to_ascii_uppercase().as_str() {
        "POST" => Ok(reqwest::Method::POST),
        "PUT" => Ok(reqwest::Method::PUT),
        "PATCH" => Ok(reqwest::Method::PATCH),
        other => Err(RenewlyError::Channel(format!(
            "Webhook: unsupported method '{other}'"
        ))),
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _target_hint: &str) -> Result<()> {
        let config: WebhookConfig = parse_config(channel)?;
        require(&config.url, "url", "Webhook")?;

        let mut request = self
            .client
            .request(parse_method(&config.method)?, &config.url)
            .json(&build_payload(channel, message));
        for (name, value) in &config.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("Webhook: {e}")))?;
        check_status(response, "Webhook").await?;
        tracing::debug!("📤 Webhook delivered to {}", config.url);
        Ok(())
    }
}
