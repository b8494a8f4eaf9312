//! Email channel: SMTP sending via async lettre.
//!
//! The recipient comes from the channel config, falling back to the
//! account email passed as the target hint.

use std::time::Duration;

use async_trait::async_trait;
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::ChannelSender;
use renewly_core::types::NotificationChannel;
use serde::Deserialize;

use crate::{REMINDER_TITLE, parse_config, require};

/// Per-channel SMTP settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address.
    pub from: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Overrides the account email as recipient.
    #[serde(default)]
    pub to: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

pub struct EmailSender {
    timeout: Duration,
}

impl EmailSender {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Configured recipient, else the hint. Empty means nowhere to send.
pub fn resolve_recipient<'a>(config: &'a EmailConfig, target_hint: &'a str) -> Option<&'a str> {
    config
        .to
        .as_deref()
        .map(str::trim)
        .filter(|to| !to.is_empty())
        .or_else(|| Some(target_hint.trim()).filter(|hint| !hint.is_empty()))
}

/// Subject line: the title plus the first line of the message.
pub fn subject_for(message: &str) -> String {
    let first = message.lines().next().unwrap_or_default().trim();
    let short: String = first.chars().take(80).collect();
    if short.is_empty() {
        REMINDER_TITLE.to_string()
    } else {
        format!("{REMINDER_TITLE}: {short}")
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(&self, channel: &NotificationChannel, message: &str, target_hint: &str) -> Result<()> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, message::Mailbox,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        let config: EmailConfig = parse_config(channel)?;
        require(&config.smtp_host, "smtp_host", "Email")?;
        let to = resolve_recipient(&config, target_hint)
            .ok_or_else(|| RenewlyError::Channel("Email: no recipient address".into()))?;

        let from_name = config.display_name.as_deref().unwrap_or("Renewly");
        let from_mailbox: Mailbox = format!("{from_name} <{}>", config.from)
            .parse()
            .map_err(|e| RenewlyError::Channel(format!("Invalid from: {e}")))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| RenewlyError::Channel(format!("Invalid to: {e}")))?;

        let email = LettreMessage::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject_for(message))
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| RenewlyError::Channel(format!("Build email: {e}")))?;

        // Port 465 is implicit TLS; everything else negotiates STARTTLS.
        let relay = if config.smtp_port == 465 {
            AsyncSmtpTransport::<lettre::Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .map_err(|e| RenewlyError::Channel(format!("SMTP relay: {e}")))?
        .port(config.smtp_port)
        .timeout(Some(self.timeout));

        let mailer = if config.username.is_empty() {
            relay.build()
        } else {
            relay
                .credentials(Credentials::new(config.username.clone(), config.password.clone()))
                .build()
        };

        mailer
            .send(email)
            .await
            .map_err(|e| RenewlyError::Channel(format!("SMTP send: {e}")))?;

        tracing::info!("📤 Email sent to: {to}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(to: Option<&str>) -> EmailConfig {
        serde_json::from_value(serde_json::json!({
            "smtp_host": "smtp.example.com",
            "from": "noreply@example.com",
            "to": to,
        }))
        .unwrap()
    }

    #[test]
    fn test_recipient_falls_back_to_hint() {
        assert_eq!(config(None).smtp_port, 587);
        assert_eq!(resolve_recipient(&config(None), "me@example.com"), Some("me@example.com"));
        assert_eq!(
            resolve_recipient(&config(Some("ops@example.com")), "me@example.com"),
            Some("ops@example.com")
        );
        assert_eq!(resolve_recipient(&config(Some("  ")), ""), None);
    }

    #[test]
    fn test_subject_uses_first_line() {
        assert_eq!(subject_for("Netflix renews soon\nmore"), "Renewly reminder: Netflix renews soon");
        assert_eq!(subject_for(""), "Renewly reminder");
    }

    #[tokio::test]
    async fn test_no_recipient_is_an_error() {
        let channel = crate::tests::channel(
            renewly_core::types::ChannelType::Email,
            serde_json::json!({"smtp_host": "smtp.example.com", "from": "a@example.com"}),
        );
        let err = EmailSender::new(Duration::from_secs(1))
            .send(&channel, "hi", "")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no recipient"));
    }
}
