//! Webhook and push-service adapters for the remaining channel types.
//!
//! Each adapter is a typed config, a pure payload builder and a
//! [`ChannelSender`] impl. Payload builders carry no I/O so they are unit
//! tested directly.

use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::ChannelSender;
use renewly_core::types::NotificationChannel;
use serde::Deserialize;
use sha2::Sha256;

use crate::{REMINDER_TITLE, check_status, parse_config, post_json, require};

type HmacSha256 = Hmac<Sha256>;

/// Discord rejects messages longer than this.
const DISCORD_MAX_CHARS: usize = 2000;

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Push services that answer HTTP 200 and report failure in a body code.
async fn check_body_code(response: reqwest::Response, field: &str, ok: i64, label: &str) -> Result<()> {
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| RenewlyError::Channel(format!("{label}: invalid response: {e}")))?;
    match body[field].as_i64() {
        None => Ok(()),
        Some(code) if code == ok => Ok(()),
        Some(code) => Err(RenewlyError::Channel(format!(
            "{label}: error {code}: {}",
            body["errmsg"].as_str().or(body["msg"].as_str()).unwrap_or_default()
        ))),
    }
}

// ═══════════════════════════════════════════════════════
// Discord (incoming webhook)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub username: Option<String>,
}

pub fn discord_payload(config: &DiscordConfig, message: &str) -> serde_json::Value {
    let mut body = serde_json::json!({ "content": truncate_chars(message, DISCORD_MAX_CHARS) });
    if let Some(name) = &config.username {
        body["username"] = serde_json::json!(name);
    }
    body
}

pub struct DiscordSender {
    client: reqwest::Client,
}

impl DiscordSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for DiscordSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: DiscordConfig = parse_config(channel)?;
        require(&config.webhook_url, "webhook_url", "Discord")?;
        post_json(&self.client, &config.webhook_url, &discord_payload(&config, message), "Discord").await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// Slack (incoming webhook)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

pub fn slack_payload(message: &str) -> serde_json::Value {
    serde_json::json!({ "text": message })
}

pub struct SlackSender {
    client: reqwest::Client,
}

impl SlackSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for SlackSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: SlackConfig = parse_config(channel)?;
        require(&config.webhook_url, "webhook_url", "Slack")?;
        post_json(&self.client, &config.webhook_url, &slack_payload(message), "Slack").await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// Microsoft Teams (incoming webhook, MessageCard)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct TeamsConfig {
    pub webhook_url: String,
}

pub fn teams_payload(message: &str) -> serde_json::Value {
    serde_json::json!({
        "@type": "MessageCard",
        "@context": "https://schema.org/extensions",
        "summary": REMINDER_TITLE,
        "title": REMINDER_TITLE,
        "text": message,
    })
}

pub struct TeamsSender {
    client: reqwest::Client,
}

impl TeamsSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for TeamsSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: TeamsConfig = parse_config(channel)?;
        require(&config.webhook_url, "webhook_url", "Teams")?;
        post_json(&self.client, &config.webhook_url, &teams_payload(message), "Teams").await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// ntfy
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct NtfyConfig {
    #[serde(default = "default_ntfy_server")]
    pub server: String,
    pub topic: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
}

fn default_ntfy_server() -> String {
    "https://ntfy.sh".into()
}

pub fn ntfy_url(config: &NtfyConfig) -> String {
    format!("{}/{}", config.server.trim_end_matches('/'), config.topic.trim_matches('/'))
}

pub struct NtfySender {
    client: reqwest::Client,
}

impl NtfySender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for NtfySender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: NtfyConfig = parse_config(channel)?;
        require(&config.topic, "topic", "ntfy")?;

        let mut request = self
            .client
            .post(ntfy_url(&config))
            .header("Title", REMINDER_TITLE)
            .body(message.to_string());
        if let Some(priority) = config.priority {
            request = request.header("Priority", priority.clamp(1, 5).to_string());
        }
        if let Some(token) = &config.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("ntfy: {e}")))?;
        check_status(response, "ntfy").await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// Gotify
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct GotifyConfig {
    pub server: String,
    pub app_token: String,
    #[serde(default = "default_gotify_priority")]
    pub priority: u8,
}

fn default_gotify_priority() -> u8 {
    5
}

pub fn gotify_payload(config: &GotifyConfig, message: &str) -> serde_json::Value {
    serde_json::json!({
        "title": REMINDER_TITLE,
        "message": message,
        "priority": config.priority,
    })
}

pub struct GotifySender {
    client: reqwest::Client,
}

impl GotifySender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for GotifySender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: GotifyConfig = parse_config(channel)?;
        require(&config.server, "server", "Gotify")?;
        require(&config.app_token, "app_token", "Gotify")?;

        let response = self
            .client
            .post(format!("{}/message", config.server.trim_end_matches('/')))
            .header("X-Gotify-Key", &config.app_token)
            .json(&gotify_payload(&config, message))
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("Gotify: {e}")))?;
        check_status(response, "Gotify").await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// Pushover
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct PushoverConfig {
    pub app_token: String,
    pub user_key: String,
    #[serde(default)]
    pub device: Option<String>,
}

pub fn pushover_form(config: &PushoverConfig, message: &str) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("token", config.app_token.clone()),
        ("user", config.user_key.clone()),
        ("title", REMINDER_TITLE.to_string()),
        ("message", message.to_string()),
    ];
    if let Some(device) = &config.device {
        form.push(("device", device.clone()));
    }
    form
}

pub struct PushoverSender {
    client: reqwest::Client,
}

impl PushoverSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for PushoverSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: PushoverConfig = parse_config(channel)?;
        require(&config.app_token, "app_token", "Pushover")?;
        require(&config.user_key, "user_key", "Pushover")?;

        let response = self
            .client
            .post("https://api.pushover.net/1/messages.json")
            .form(&pushover_form(&config, message))
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("Pushover: {e}")))?;
        check_status(response, "Pushover").await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════
// Bark (iOS push)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct BarkConfig {
    #[serde(default = "default_bark_server")]
    pub server: String,
    pub device_key: String,
    #[serde(default)]
    pub group: Option<String>,
}

fn default_bark_server() -> String {
    "https://api.day.app".into()
}

pub fn bark_payload(config: &BarkConfig, message: &str) -> serde_json::Value {
    let mut body = serde_json::json!({
        "device_key": config.device_key,
        "title": REMINDER_TITLE,
        "body": message,
    });
    if let Some(group) = &config.group {
        body["group"] = serde_json::json!(group);
    }
    body
}

pub struct BarkSender {
    client: reqwest::Client,
}

impl BarkSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for BarkSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: BarkConfig = parse_config(channel)?;
        require(&config.device_key, "device_key", "Bark")?;
        let url = format!("{}/push", config.server.trim_end_matches('/'));
        let response = post_json(&self.client, &url, &bark_payload(&config, message), "Bark").await?;
        check_body_code(response, "code", 200, "Bark").await
    }
}

// ═══════════════════════════════════════════════════════
// Feishu / Lark (custom bot)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct FeishuConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Feishu signs with the `"{timestamp}\n{secret}"` string as HMAC key over an empty message.
pub fn feishu_sign(timestamp_secs: i64, secret: &str) -> Result<String> {
    let key = format!("{timestamp_secs}\n{secret}");
    let mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| RenewlyError::Channel(format!("Feishu sign: {e}")))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn feishu_payload(config: &FeishuConfig, message: &str, timestamp_secs: i64) -> Result<serde_json::Value> {
    let mut body = serde_json::json!({
        "msg_type": "text",
        "content": { "text": message },
    });
    if let Some(secret) = config.secret.as_deref().filter(|s| !s.is_empty()) {
        body["timestamp"] = serde_json::json!(timestamp_secs.to_string());
        body["sign"] = serde_json::json!(feishu_sign(timestamp_secs, secret)?);
    }
    Ok(body)
}

pub struct FeishuSender {
    client: reqwest::Client,
}

impl FeishuSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for FeishuSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: FeishuConfig = parse_config(channel)?;
        require(&config.webhook_url, "webhook_url", "Feishu")?;
        let body = feishu_payload(&config, message, chrono::Utc::now().timestamp())?;
        let response = post_json(&self.client, &config.webhook_url, &body, "Feishu").await?;
        check_body_code(response, "code", 0, "Feishu").await
    }
}

// ═══════════════════════════════════════════════════════
// DingTalk (custom robot)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct DingtalkConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub secret: Option<String>,
}

/// DingTalk signs `"{timestamp_ms}\n{secret}"` with the secret as HMAC key.
pub fn dingtalk_sign(timestamp_ms: i64, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RenewlyError::Channel(format!("DingTalk sign: {e}")))?;
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

pub fn dingtalk_payload(message: &str) -> serde_json::Value {
    serde_json::json!({
        "msgtype": "text",
        "text": { "content": message },
    })
}

pub struct DingtalkSender {
    client: reqwest::Client,
}

impl DingtalkSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for DingtalkSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: DingtalkConfig = parse_config(channel)?;
        require(&config.webhook_url, "webhook_url", "DingTalk")?;

        let mut request = self.client.post(&config.webhook_url).json(&dingtalk_payload(message));
        if let Some(secret) = config.secret.as_deref().filter(|s| !s.is_empty()) {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let sign = dingtalk_sign(timestamp, secret)?;
            request = request.query(&[("timestamp", timestamp.to_string()), ("sign", sign)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("DingTalk: {e}")))?;
        let response = check_status(response, "DingTalk").await?;
        check_body_code(response, "errcode", 0, "DingTalk").await
    }
}

// ═══════════════════════════════════════════════════════
// WeCom (group robot)
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct WecomConfig {
    pub webhook_url: String,
}

pub struct WecomSender {
    client: reqwest::Client,
}

impl WecomSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for WecomSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: WecomConfig = parse_config(channel)?;
        require(&config.webhook_url, "webhook_url", "WeCom")?;
        // Same text body shape as DingTalk.
        let response = post_json(&self.client, &config.webhook_url, &dingtalk_payload(message), "WeCom").await?;
        check_body_code(response, "errcode", 0, "WeCom").await
    }
}

// ═══════════════════════════════════════════════════════
// ServerChan
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct ServerchanConfig {
    pub send_key: String,
}

pub fn serverchan_url(config: &ServerchanConfig) -> String {
    format!("https://sctapi.ftqq.com/{}.send", config.send_key.trim())
}

pub struct ServerchanSender {
    client: reqwest::Client,
}

impl ServerchanSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for ServerchanSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: ServerchanConfig = parse_config(channel)?;
        require(&config.send_key, "send_key", "ServerChan")?;
        let response = self
            .client
            .post(serverchan_url(&config))
            .form(&[("title", REMINDER_TITLE), ("desp", message)])
            .send()
            .await
            .map_err(|e| RenewlyError::Channel(format!("ServerChan: {e}")))?;
        let response = check_status(response, "ServerChan").await?;
        check_body_code(response, "code", 0, "ServerChan").await
    }
}

// ═══════════════════════════════════════════════════════
// PushPlus
// ═══════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct PushplusConfig {
    pub token: String,
    #[serde(default)]
    pub topic: Option<String>,
}

pub fn pushplus_payload(config: &PushplusConfig, message: &str) -> serde_json::Value {
    let mut body = serde_json::json!({
        "token": config.token,
        "title": REMINDER_TITLE,
        "content": message,
        "template": "txt",
    });
    if let Some(topic) = &config.topic {
        body["topic"] = serde_json::json!(topic);
    }
    body
}

pub struct PushplusSender {
    client: reqwest::Client,
}

impl PushplusSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelSender for PushplusSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, _: &str) -> Result<()> {
        let config: PushplusConfig = parse_config(channel)?;
        require(&config.token, "token", "PushPlus")?;
        let response = post_json(
            &self.client,
            "https://www.pushplus.plus/send",
            &pushplus_payload(&config, message),
            "PushPlus",
        )
        .await?;
        check_body_code(response, "code", 200, "PushPlus").await
    }
}
