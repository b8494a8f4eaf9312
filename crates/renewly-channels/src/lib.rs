//! # Renewly Channels
//! Outbound notification senders, one per channel type.
//!
//! Every sender reads its settings from the channel's JSON config at send
//! time, so one sender instance serves every user. [`SenderRegistry`] maps a
//! channel type to its sender and is itself a [`ChannelSender`].

pub mod adapters;
pub mod email;
pub mod telegram;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::ChannelSender;
use renewly_core::types::{ChannelType, NotificationChannel};
use serde::de::DeserializeOwned;

/// Title used by channels that show one.
pub const REMINDER_TITLE: &str = "Renewly reminder";

/// Lookup table from channel type to sender.
#[derive(Default, Clone)]
pub struct SenderRegistry {
    senders: HashMap<ChannelType, Arc<dyn ChannelSender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a sender for every channel type.
    pub fn with_defaults(timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)?;
        let mut registry = Self::new();
        registry.register(ChannelType::Telegram, Arc::new(telegram::TelegramSender::new(client.clone())));
        registry.register(ChannelType::Email, Arc::new(email::EmailSender::new(timeout)));
        registry.register(ChannelType::Webhook, Arc::new(webhook::WebhookSender::new(client.clone())));
        registry.register(ChannelType::Discord, Arc::new(adapters::DiscordSender::new(client.clone())));
        registry.register(ChannelType::Slack, Arc::new(adapters::SlackSender::new(client.clone())));
        registry.register(ChannelType::Teams, Arc::new(adapters::TeamsSender::new(client.clone())));
        registry.register(ChannelType::Ntfy, Arc::new(adapters::NtfySender::new(client.clone())));
        registry.register(ChannelType::Gotify, Arc::new(adapters::GotifySender::new(client.clone())));
        registry.register(ChannelType::Pushover, Arc::new(adapters::PushoverSender::new(client.clone())));
        registry.register(ChannelType::Bark, Arc::new(adapters::BarkSender::new(client.clone())));
        registry.register(ChannelType::Feishu, Arc::new(adapters::FeishuSender::new(client.clone())));
        registry.register(ChannelType::Dingtalk, Arc::new(adapters::DingtalkSender::new(client.clone())));
        registry.register(ChannelType::Wecom, Arc::new(adapters::WecomSender::new(client.clone())));
        registry.register(ChannelType::Serverchan, Arc::new(adapters::ServerchanSender::new(client.clone())));
        registry.register(ChannelType::Pushplus, Arc::new(adapters::PushplusSender::new(client)));
        tracing::debug!("📡 Registered {} channel senders", registry.len());
        Ok(registry)
    }

    /// Add or replace the sender for `channel_type`.
    pub fn register(&mut self, channel_type: ChannelType, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(channel_type, sender);
    }

    pub fn get(&self, channel_type: ChannelType) -> Option<Arc<dyn ChannelSender>> {
        self.senders.get(&channel_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[async_trait]
impl ChannelSender for SenderRegistry {
    async fn send(&self, channel: &NotificationChannel, message: &str, target_hint: &str) -> Result<()> {
        let sender = self.get(channel.channel_type).ok_or_else(|| {
            RenewlyError::Channel(format!("no sender registered for '{}'", channel.channel_type))
        })?;
        sender.send(channel, message, target_hint).await
    }
}

// ─── Shared helpers ─────────────────────────────────────

/// HTTP client shared by the webhook-style senders.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("renewly/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RenewlyError::Channel(format!("HTTP client: {e}")))
}

/// Deserialize a channel's JSON config into the sender's typed config.
pub(crate) fn parse_config<T: DeserializeOwned>(channel: &NotificationChannel) -> Result<T> {
    serde_json::from_value(channel.config.clone()).map_err(|e| {
        RenewlyError::Channel(format!("invalid {} config: {e}", channel.channel_type))
    })
}

/// Fail on non-2xx responses, keeping a snippet of the body for the log.
pub(crate) async fn check_status(response: reqwest::Response, label: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(RenewlyError::Channel(format!("{label}: HTTP {status}: {snippet}")))
}

/// Send a JSON body with POST and require a 2xx status.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
    label: &str,
) -> Result<reqwest::Response> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RenewlyError::Channel(format!("{label}: {e}")))?;
    check_status(response, label).await
}

pub(crate) fn require(value: &str, field: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RenewlyError::Channel(format!("{label}: '{field}' is required")));
    }
    Ok(())
}
