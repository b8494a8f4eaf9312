//! Domain types: subscriptions, notification policy, channels and delivery log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How a subscription bills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    Recurring,
    OneTime,
}

impl BillingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingType::Recurring => "recurring",
            BillingType::OneTime => "one_time",
        }
    }

    /// Parse a stored tag. `lifetime` is the legacy spelling of `one_time`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recurring" => Some(BillingType::Recurring),
            "one_time" | "lifetime" => Some(BillingType::OneTime),
            _ => None,
        }
    }
}

/// Rule family for generating occurrences of a recurring subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    /// Every N days/weeks/months/years from an anchor.
    Interval,
    /// A fixed day of the month.
    MonthlyDate,
    /// A fixed month and day.
    YearlyDate,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Interval => "interval",
            RecurrenceType::MonthlyDate => "monthly_date",
            RecurrenceType::YearlyDate => "yearly_date",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "interval" => Some(RecurrenceType::Interval),
            "monthly_date" => Some(RecurrenceType::MonthlyDate),
            "yearly_date" => Some(RecurrenceType::YearlyDate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Day => "day",
            IntervalUnit::Week => "week",
            IntervalUnit::Month => "month",
            IntervalUnit::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(IntervalUnit::Day),
            "week" => Some(IntervalUnit::Week),
            "month" => Some(IntervalUnit::Month),
            "year" => Some(IntervalUnit::Year),
            _ => None,
        }
    }
}

/// A tracked subscription owned by a user.
///
/// For recurring subscriptions exactly one recurrence field set is populated,
/// matching `recurrence_type`. Values loaded from storage are not trusted:
/// schedule code treats an incomplete set as an invalid schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub billing_type: BillingType,
    pub recurrence_type: Option<RecurrenceType>,
    pub interval_count: Option<u32>,
    pub interval_unit: Option<IntervalUnit>,
    pub monthly_day: Option<u32>,
    pub yearly_month: Option<u32>,
    pub yearly_day: Option<u32>,
    /// Calendar date of the next charge (UTC midnight semantics).
    pub next_occurrence: Option<NaiveDate>,
    pub amount: f64,
    pub currency: String,
    pub enabled: bool,
    /// Per-subscription override of the user's policy.
    pub notify_enabled: Option<bool>,
    pub notify_days_before: Option<u32>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub url: Option<String>,
    pub remark: Option<String>,
}

impl Subscription {
    /// A bare recurring subscription with no recurrence fields set yet.
    pub fn new(user_id: i64, name: &str, amount: f64, currency: &str) -> Self {
        Self {
            id: 0,
            user_id,
            name: name.to_string(),
            billing_type: BillingType::Recurring,
            recurrence_type: None,
            interval_count: None,
            interval_unit: None,
            monthly_day: None,
            yearly_month: None,
            yearly_day: None,
            next_occurrence: None,
            amount,
            currency: currency.to_string(),
            enabled: true,
            notify_enabled: None,
            notify_days_before: None,
            category: None,
            payment_method: None,
            url: None,
            remark: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.billing_type == BillingType::Recurring
    }
}

/// Per-user reminder defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPolicy {
    pub user_id: i64,
    pub days_before: u32,
    pub notify_on_due_day: bool,
}

impl NotificationPolicy {
    pub const DEFAULT_DAYS_BEFORE: u32 = 3;
    pub const MAX_DAYS_BEFORE: u32 = 10;

    pub fn default_for(user_id: i64) -> Self {
        Self {
            user_id,
            days_before: Self::DEFAULT_DAYS_BEFORE,
            notify_on_due_day: true,
        }
    }
}

/// Outbound channel kinds. Each kind has exactly one sender implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Telegram,
    Email,
    Webhook,
    Discord,
    Slack,
    Teams,
    Ntfy,
    Gotify,
    Pushover,
    Bark,
    Feishu,
    Dingtalk,
    Wecom,
    Serverchan,
    Pushplus,
}

impl ChannelType {
    pub const ALL: [ChannelType; 15] = [
        ChannelType::Telegram,
        ChannelType::Email,
        ChannelType::Webhook,
        ChannelType::Discord,
        ChannelType::Slack,
        ChannelType::Teams,
        ChannelType::Ntfy,
        ChannelType::Gotify,
        ChannelType::Pushover,
        ChannelType::Bark,
        ChannelType::Feishu,
        ChannelType::Dingtalk,
        ChannelType::Wecom,
        ChannelType::Serverchan,
        ChannelType::Pushplus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Telegram => "telegram",
            ChannelType::Email => "email",
            ChannelType::Webhook => "webhook",
            ChannelType::Discord => "discord",
            ChannelType::Slack => "slack",
            ChannelType::Teams => "teams",
            ChannelType::Ntfy => "ntfy",
            ChannelType::Gotify => "gotify",
            ChannelType::Pushover => "pushover",
            ChannelType::Bark => "bark",
            ChannelType::Feishu => "feishu",
            ChannelType::Dingtalk => "dingtalk",
            ChannelType::Wecom => "wecom",
            ChannelType::Serverchan => "serverchan",
            ChannelType::Pushplus => "pushplus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's configured notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: i64,
    pub user_id: i64,
    pub channel_type: ChannelType,
    pub enabled: bool,
    /// Sender-specific settings; opaque to the scheduler.
    pub config: serde_json::Value,
    /// Message template overriding the configured default.
    pub template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Sent,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Sent => "sent",
            LogStatus::Failed => "failed",
        }
    }
}

/// One delivery attempt, keyed by `(subscription_id, channel_type, notify_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationLog {
    pub subscription_id: i64,
    pub user_id: i64,
    pub channel_type: ChannelType,
    pub notify_date: NaiveDate,
    pub status: LogStatus,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}
