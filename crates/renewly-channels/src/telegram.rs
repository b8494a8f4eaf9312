//! Telegram Bot channel: message sending via Bot API.

use async_trait::async_trait;
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::ChannelSender;
use renewly_core::types::NotificationChannel;
use serde::Deserialize;

use crate::{parse_config, require};

/// Per-channel Telegram settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Numeric chat id or `@channelname`.
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramSender {
    client: reqwest::Client,
}

impl TelegramSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

pub fn api_url(config: &TelegramConfig, method: &str) -> String {
    format!(
        "{}/bot{}/{}",
        config.api_base.trim_end_matches('/'),
        config.bot_token,
        method
    )
}

pub fn build_payload(config: &TelegramConfig, text: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": config.chat_id,
        "text": text,
        "disable_web_page_preview": true,
    })
}

#[async_trait]
impl ChannelSender for TelegramSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _target_hint: &str) -> Result<()> {
        let config: TelegramConfig = parse_config(channel)?;
        require(&config.bot_token, "bot_token", "Telegram")?;
        require(&config.chat_id, "chat_id", "Telegram")?;

        let response = self
            .client
            .post(api_url(&config, "sendMessage"))
            .json(&build_payload(&config, message))
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("Telegram sendMessage failed: {e}")))?;

        // Telegram reports errors in the body, often with a 4xx status too.
        let result: TelegramApiResponse = response
            .json()
            .await
            .map_err(|e| RenewlyError::Channel(format!("Invalid Telegram response: {e}")))?;

        if !result.ok {
            return Err(RenewlyError::Channel(format!(
                "Telegram send failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        tracing::debug!("📤 Telegram message sent to {}", config.chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_url() {
        let config: TelegramConfig =
            serde_json::from_value(serde_json::json!({"bot_token": "123:abc", "chat_id": "-100"}))
                .unwrap();
        assert_eq!(
            api_url(&config, "sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        let payload = build_payload(&config, "Netflix renews tomorrow");
        assert_eq!(payload["chat_id"], "-100");
        assert_eq!(payload["text"], "Netflix renews tomorrow");
    }

    #[tokio::test]
    async fn test_missing_chat_id_fails_before_network() {
        let sender = TelegramSender::new(reqwest::Client::new());
        let channel = crate::tests::channel(
            renewly_core::types::ChannelType::Telegram,
            serde_json::json!({"bot_token": "t", "chat_id": " "}),
        );
        let err = sender.send(&channel, "hi", "").await.unwrap_err();
        assert!(err.to_string().contains("'chat_id' is required"));
    }
}
