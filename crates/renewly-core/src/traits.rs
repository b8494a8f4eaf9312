//! Collaborator contracts the scheduling core depends on.
//!
//! The scheduler never touches a database, an HTTP client or a template
//! engine directly. Everything goes through these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{
    ChannelType, NotificationChannel, NotificationLog, NotificationPolicy, Subscription,
};

/// Persistence operations used by the schedule engine and dispatch pipeline.
#[async_trait]
pub trait Store: Send + Sync {
    /// Users owning at least one enabled channel.
    async fn list_users_with_enabled_channels(&self) -> Result<Vec<i64>>;

    async fn find_user_email(&self, user_id: i64) -> Result<Option<String>>;

    /// Recurring subscriptions whose `next_occurrence` is strictly before `before`.
    async fn find_overdue_recurring(&self, user_id: i64, before: NaiveDate)
        -> Result<Vec<Subscription>>;

    async fn update_next_occurrence(&self, subscription_id: i64, date: NaiveDate) -> Result<()>;

    /// Enabled recurring subscriptions that have a `next_occurrence`.
    async fn find_notifiable_subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>>;

    /// Every subscription of the user, enabled or not.
    async fn find_subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>>;

    async fn find_enabled_channels(&self, user_id: i64) -> Result<Vec<NotificationChannel>>;

    async fn find_policy(&self, user_id: i64) -> Result<Option<NotificationPolicy>>;

    /// Insert the policy row or replace the existing one.
    async fn upsert_policy(&self, policy: &NotificationPolicy) -> Result<()>;

    async fn insert_log(&self, entry: &NotificationLog) -> Result<()>;

    /// Whether a `sent` row exists for this exact dedup key.
    async fn exists_sent_log(
        &self,
        subscription_id: i64,
        channel_type: ChannelType,
        notify_date: NaiveDate,
    ) -> Result<bool>;
}

/// Delivers a rendered message over one channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// `target_hint` carries a user-level destination (e.g. the account email)
    /// for senders whose config does not name one.
    async fn send(&self, channel: &NotificationChannel, message: &str, target_hint: &str)
        -> Result<()>;
}

/// Renders a message template against a fixed set of substitution fields.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, fields: &HashMap<&'static str, String>) -> Result<String>;
}
