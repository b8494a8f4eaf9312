//! SQLite-backed persistence for subscriptions, policies, channels and the
//! delivery log. Survives restarts; the log doubles as the dedup record.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::Store;
use renewly_core::types::{
    BillingType, ChannelType, IntervalUnit, LogStatus, NotificationChannel, NotificationLog,
    NotificationPolicy, RecurrenceType, Subscription,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, name, billing_type, recurrence_type, \
    interval_count, interval_unit, monthly_day, yearly_month, yearly_day, next_occurrence, \
    amount, currency, enabled, notify_enabled, notify_days_before, category, payment_method, \
    url, remark";

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> RenewlyError + '_ {
    move |e| RenewlyError::Database(format!("{context}: {e}"))
}

/// SQLite store implementing [`Store`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err("DB open"))?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("DB open"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RenewlyError::Database(format!("connection lock poisoned: {e}")))
    }

    /// Create tables if they do not exist yet.
    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                billing_type TEXT NOT NULL,          -- 'recurring', 'one_time'
                recurrence_type TEXT,                -- 'interval', 'monthly_date', 'yearly_date'
                interval_count INTEGER,
                interval_unit TEXT,                  -- 'day', 'week', 'month', 'year'
                monthly_day INTEGER,
                yearly_month INTEGER,
                yearly_day INTEGER,
                next_occurrence TEXT,                -- YYYY-MM-DD
                amount REAL NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'USD',
                enabled INTEGER NOT NULL DEFAULT 1,
                notify_enabled INTEGER,
                notify_days_before INTEGER,
                category TEXT,
                payment_method TEXT,
                url TEXT,
                remark TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_subscriptions_user
                ON subscriptions(user_id, billing_type, next_occurrence);

            CREATE TABLE IF NOT EXISTS notification_policies (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                days_before INTEGER NOT NULL DEFAULT 3,
                notify_on_due_day INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS notification_channels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                channel_type TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                config TEXT NOT NULL DEFAULT '{}',   -- JSON, sender specific
                template TEXT
            );

            -- Append-only delivery log
            CREATE TABLE IF NOT EXISTS notification_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subscription_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                channel_type TEXT NOT NULL,
                notify_date TEXT NOT NULL,           -- occurrence date the reminder is for
                status TEXT NOT NULL,                -- 'sent', 'failed'
                error TEXT,
                sent_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_notification_logs_sent_key
                ON notification_logs(subscription_id, channel_type, notify_date)
                WHERE status = 'sent';
         ",
            )
            .map_err(db_err("Migration"))?;
        Ok(())
    }

    // ─── Records ─────────────────────────────────────────────

    pub fn create_user(&self, email: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO users (email) VALUES (?1)", [email])
            .map_err(db_err("Create user"))?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a subscription, ignoring `sub.id`. Returns the new id.
    pub fn insert_subscription(&self, sub: &Subscription) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO subscriptions
             (user_id, name, billing_type, recurrence_type, interval_count, interval_unit,
              monthly_day, yearly_month, yearly_day, next_occurrence, amount, currency, enabled,
              notify_enabled, notify_days_before, category, payment_method, url, remark)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                sub.user_id,
                sub.name,
                sub.billing_type.as_str(),
                sub.recurrence_type.map(|r| r.as_str()),
                sub.interval_count,
                sub.interval_unit.map(|u| u.as_str()),
                sub.monthly_day,
                sub.yearly_month,
                sub.yearly_day,
                sub.next_occurrence.map(|d| d.to_string()),
                sub.amount,
                sub.currency,
                sub.enabled,
                sub.notify_enabled,
                sub.notify_days_before,
                sub.category,
                sub.payment_method,
                sub.url,
                sub.remark,
            ],
        )
        .map_err(db_err("Insert subscription"))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_subscription(&self, id: i64) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?1"),
            [id],
            subscription_from_row,
        )
        .optional()
        .map_err(db_err("Get subscription"))?
        .transpose()
    }

    pub fn insert_channel(
        &self,
        user_id: i64,
        channel_type: ChannelType,
        config: &serde_json::Value,
        template: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notification_channels (user_id, channel_type, enabled, config, template)
             VALUES (?1, ?2, 1, ?3, ?4)",
            params![user_id, channel_type.as_str(), config.to_string(), template],
        )
        .map_err(db_err("Insert channel"))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_channel_enabled(&self, channel_id: i64, enabled: bool) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE notification_channels SET enabled = ?1 WHERE id = ?2",
                params![enabled, channel_id],
            )
            .map_err(db_err("Update channel"))?;
        Ok(())
    }

    /// Delivery log rows for one subscription, oldest first.
    pub fn logs_for_subscription(&self, subscription_id: i64) -> Result<Vec<NotificationLog>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT subscription_id, user_id, channel_type, notify_date, status, error, sent_at
                 FROM notification_logs WHERE subscription_id = ?1 ORDER BY id",
            )
            .map_err(db_err("Query logs"))?;
        let rows = stmt
            .query_map([subscription_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(db_err("Query logs"))?;

        let mut logs = Vec::new();
        for row in rows {
            let (subscription_id, user_id, channel, date, status, error, sent_at) =
                row.map_err(db_err("Read log"))?;
            let Some(channel_type) = ChannelType::parse(&channel) else {
                tracing::warn!("⚠️ Skipping log row with unknown channel type '{channel}'");
                continue;
            };
            logs.push(NotificationLog {
                subscription_id,
                user_id,
                channel_type,
                notify_date: parse_date(&date)?,
                status: if status == "sent" { LogStatus::Sent } else { LogStatus::Failed },
                error,
                sent_at: DateTime::parse_from_rfc3339(&sent_at)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|e| {
                        tracing::warn!(
                            "⚠️ Log row for subscription {subscription_id} has bad sent_at '{sent_at}': {e}"
                        );
                        Utc::now()
                    }),
            });
        }
        Ok(logs)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str, args: impl rusqlite::Params) -> Result<usize> {
        self.conn()?.execute(sql, args).map_err(db_err("Raw statement"))
    }

    fn query_subscriptions(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(db_err("Query subscriptions"))?;
        let rows = stmt
            .query_map(args, subscription_from_row)
            .map_err(db_err("Query subscriptions"))?;

        let mut subs = Vec::new();
        for row in rows {
            match row.map_err(db_err("Read subscription"))? {
                Ok(sub) => subs.push(sub),
                Err(e) => tracing::warn!("⚠️ Skipping malformed subscription row: {e}"),
            }
        }
        Ok(subs)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse::<NaiveDate>()
        .map_err(|e| RenewlyError::Database(format!("bad date '{s}': {e}")))
}

/// Read a small non-negative integer column. Out-of-range values read as
/// `None`, which the schedule code treats as an invalid field.
fn opt_u32(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u32>> {
    Ok(row
        .get::<_, Option<i64>>(idx)?
        .and_then(|v| u32::try_from(v).ok()))
}

/// Decode a subscription row. The outer error is a SQLite failure; the inner
/// one flags stored data that cannot be interpreted at all.
fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Subscription>> {
    let id: i64 = row.get(0)?;
    let billing_type: String = row.get(3)?;
    let next_occurrence: Option<String> = row.get(10)?;

    let Some(billing_type) = BillingType::parse(&billing_type) else {
        return Ok(Err(RenewlyError::Database(format!(
            "subscription {id}: unknown billing type '{billing_type}'"
        ))));
    };
    let next_occurrence = match next_occurrence.as_deref().map(parse_date).transpose() {
        Ok(d) => d,
        Err(e) => return Ok(Err(e)),
    };

    Ok(Ok(Subscription {
        id,
        user_id: row.get(1)?,
        name: row.get(2)?,
        billing_type,
        recurrence_type: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| RecurrenceType::parse(&s)),
        interval_count: opt_u32(row, 5)?,
        interval_unit: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| IntervalUnit::parse(&s)),
        monthly_day: opt_u32(row, 7)?,
        yearly_month: opt_u32(row, 8)?,
        yearly_day: opt_u32(row, 9)?,
        next_occurrence,
        amount: row.get(11)?,
        currency: row.get(12)?,
        enabled: row.get(13)?,
        notify_enabled: row.get(14)?,
        notify_days_before: opt_u32(row, 15)?,
        category: row.get(16)?,
        payment_method: row.get(17)?,
        url: row.get(18)?,
        remark: row.get(19)?,
    }))
}

#[async_trait]
impl Store for SqliteStore {
    async fn list_users_with_enabled_channels(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT user_id FROM notification_channels WHERE enabled = 1 ORDER BY user_id",
            )
            .map_err(db_err("Query users"))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(db_err("Query users"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read users"))?;
        Ok(ids)
    }

    async fn find_user_email(&self, user_id: i64) -> Result<Option<String>> {
        self.conn()?
            .query_row("SELECT email FROM users WHERE id = ?1", [user_id], |row| row.get(0))
            .optional()
            .map_err(db_err("Find user"))
    }

    async fn find_overdue_recurring(
        &self,
        user_id: i64,
        before: NaiveDate,
    ) -> Result<Vec<Subscription>> {
        self.query_subscriptions(
            &format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE user_id = ?1 AND billing_type = 'recurring'
                   AND next_occurrence IS NOT NULL AND next_occurrence < ?2
                 ORDER BY id"
            ),
            params![user_id, before.to_string()],
        )
    }

    async fn update_next_occurrence(&self, subscription_id: i64, date: NaiveDate) -> Result<()> {
        self.conn()?
            .execute(
                "UPDATE subscriptions SET next_occurrence = ?1 WHERE id = ?2",
                params![date.to_string(), subscription_id],
            )
            .map_err(db_err("Update next occurrence"))?;
        Ok(())
    }

    async fn find_notifiable_subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>> {
        self.query_subscriptions(
            &format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE user_id = ?1 AND enabled = 1 AND billing_type = 'recurring'
                   AND next_occurrence IS NOT NULL
                 ORDER BY id"
            ),
            [user_id],
        )
    }

    async fn find_subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>> {
        self.query_subscriptions(
            &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ?1 ORDER BY id"),
            [user_id],
        )
    }

    async fn find_enabled_channels(&self, user_id: i64) -> Result<Vec<NotificationChannel>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, channel_type, config, template FROM notification_channels
                 WHERE user_id = ?1 AND enabled = 1 ORDER BY id",
            )
            .map_err(db_err("Query channels"))?;
        let rows = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(db_err("Query channels"))?;

        let mut channels = Vec::new();
        for row in rows {
            let (id, user_id, kind, config, template) = row.map_err(db_err("Read channel"))?;
            let Some(channel_type) = ChannelType::parse(&kind) else {
                tracing::warn!("⚠️ Channel {id} has unknown type '{kind}', skipping");
                continue;
            };
            channels.push(NotificationChannel {
                id,
                user_id,
                channel_type,
                enabled: true,
                config: serde_json::from_str(&config).unwrap_or_else(|e| {
                    tracing::warn!("⚠️ Channel {id} has unreadable config, using empty: {e}");
                    serde_json::Value::Null
                }),
                template,
            });
        }
        Ok(channels)
    }

    async fn find_policy(&self, user_id: i64) -> Result<Option<NotificationPolicy>> {
        self.conn()?
            .query_row(
                "SELECT user_id, days_before, notify_on_due_day FROM notification_policies
                 WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(NotificationPolicy {
                        user_id: row.get(0)?,
                        days_before: row.get(1)?,
                        notify_on_due_day: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(db_err("Find policy"))
    }

    async fn upsert_policy(&self, policy: &NotificationPolicy) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO notification_policies (user_id, days_before, notify_on_due_day)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    days_before = excluded.days_before,
                    notify_on_due_day = excluded.notify_on_due_day",
                params![policy.user_id, policy.days_before, policy.notify_on_due_day],
            )
            .map_err(db_err("Upsert policy"))?;
        Ok(())
    }

    async fn insert_log(&self, entry: &NotificationLog) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO notification_logs
                 (subscription_id, user_id, channel_type, notify_date, status, error, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.subscription_id,
                    entry.user_id,
                    entry.channel_type.as_str(),
                    entry.notify_date.to_string(),
                    entry.status.as_str(),
                    entry.error,
                    entry.sent_at.to_rfc3339(),
                ],
            )
            .map_err(db_err("Insert log"))?;
        Ok(())
    }

    async fn exists_sent_log(
        &self,
        subscription_id: i64,
        channel_type: ChannelType,
        notify_date: NaiveDate,
    ) -> Result<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM notification_logs
                 WHERE subscription_id = ?1 AND channel_type = ?2 AND notify_date = ?3
                   AND status = 'sent'
                 LIMIT 1",
                params![subscription_id, channel_type.as_str(), notify_date.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("Check sent log"))?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly(user_id: i64, day: u32, next: NaiveDate) -> Subscription {
        let mut sub = Subscription::new(user_id, "music", 11.99, "USD");
        sub.recurrence_type = Some(RecurrenceType::MonthlyDate);
        sub.monthly_day = Some(day);
        sub.next_occurrence = Some(next);
        sub.category = Some("Entertainment".into());
        sub
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = std::env::temp_dir().join("renewly-store-reopen-test");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("renewly.db");
        let id = {
            let store = SqliteStore::open(&path).unwrap();
            let user = store.create_user("reopen@example.com").unwrap();
            store.insert_subscription(&monthly(user, 5, d(2026, 4, 5))).unwrap()
        };
        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.get_subscription(id).unwrap().unwrap();
        assert_eq!(loaded.monthly_day, Some(5));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_subscription_fields_persist() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store.create_user("a@example.com").unwrap();
        let mut sub = monthly(user, 31, d(2026, 1, 31));
        sub.notify_days_before = Some(2);
        let id = store.insert_subscription(&sub).unwrap();

        let loaded = store.get_subscription(id).unwrap().unwrap();
        sub.id = id;
        assert_eq!(loaded, sub);
    }

    #[tokio::test]
    async fn test_overdue_query_only_returns_stale_recurring() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store.create_user("a@example.com").unwrap();
        let stale = store.insert_subscription(&monthly(user, 1, d(2026, 1, 1))).unwrap();
        store.insert_subscription(&monthly(user, 20, d(2026, 3, 20))).unwrap();
        let mut one_time = Subscription::new(user, "course", 50.0, "USD");
        one_time.billing_type = BillingType::OneTime;
        one_time.next_occurrence = Some(d(2025, 12, 1));
        store.insert_subscription(&one_time).unwrap();

        let overdue = store.find_overdue_recurring(user, d(2026, 3, 1)).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, stale);
    }

    #[tokio::test]
    async fn test_malformed_row_is_skipped() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store.create_user("a@example.com").unwrap();
        store.insert_subscription(&monthly(user, 3, d(2026, 3, 3))).unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO subscriptions (user_id, name, billing_type) VALUES (?1, 'bad', 'weekly')",
                [user],
            )
            .unwrap();
        assert_eq!(store.find_subscriptions(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_fields_read_as_missing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store.create_user("a@example.com").unwrap();
        let healthy = store.insert_subscription(&monthly(user, 3, d(2026, 3, 3))).unwrap();
        let corrupt = store.insert_subscription(&monthly(user, 9, d(2026, 3, 9))).unwrap();
        store
            .execute_raw(
                "UPDATE subscriptions SET monthly_day = -1, notify_days_before = -4 WHERE id = ?1",
                [corrupt],
            )
            .unwrap();

        let subs = store.find_notifiable_subscriptions(user).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].id, healthy);
        assert_eq!(subs[1].monthly_day, None);
        assert_eq!(subs[1].notify_days_before, None);
        assert!(!crate::schedule::has_valid_schedule(&subs[1]));
    }

    #[tokio::test]
    async fn test_channels_and_users() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = store.create_user("a@example.com").unwrap();
        let b = store.create_user("b@example.com").unwrap();
        store
            .insert_channel(a, ChannelType::Telegram, &serde_json::json!({"chat_id": "1"}), None)
            .unwrap();
        let off = store
            .insert_channel(b, ChannelType::Email, &serde_json::json!({}), Some("{{name}}"))
            .unwrap();
        store.set_channel_enabled(off, false).unwrap();

        assert_eq!(store.list_users_with_enabled_channels().await.unwrap(), vec![a]);
        let channels = store.find_enabled_channels(a).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].config["chat_id"], "1");
        assert!(store.find_enabled_channels(b).await.unwrap().is_empty());
        assert_eq!(
            store.find_user_email(b).await.unwrap().as_deref(),
            Some("b@example.com")
        );
    }

    #[tokio::test]
    async fn test_unreadable_config_and_timestamp_still_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store.create_user("c@example.com").unwrap();
        let channel = store
            .insert_channel(user, ChannelType::Webhook, &serde_json::json!({"url": "x"}), None)
            .unwrap();
        store
            .execute_raw(
                "UPDATE notification_channels SET config = '{not json' WHERE id = ?1",
                [channel],
            )
            .unwrap();
        let channels = store.find_enabled_channels(user).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert!(channels[0].config.is_null());

        let entry = NotificationLog {
            subscription_id: 4,
            user_id: user,
            channel_type: ChannelType::Webhook,
            notify_date: d(2026, 5, 1),
            status: LogStatus::Sent,
            error: None,
            sent_at: Utc::now(),
        };
        store.insert_log(&entry).await.unwrap();
        store
            .execute_raw("UPDATE notification_logs SET sent_at = 'yesterday-ish'", [])
            .unwrap();
        let logs = store.logs_for_subscription(4).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].notify_date, d(2026, 5, 1));
    }

    #[tokio::test]
    async fn test_sent_log_dedup_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let date = d(2026, 5, 1);
        let mut entry = NotificationLog {
            subscription_id: 9,
            user_id: 1,
            channel_type: ChannelType::Slack,
            notify_date: date,
            status: LogStatus::Failed,
            error: Some("timeout".into()),
            sent_at: Utc::now(),
        };
        store.insert_log(&entry).await.unwrap();
        assert!(!store.exists_sent_log(9, ChannelType::Slack, date).await.unwrap());

        entry.status = LogStatus::Sent;
        entry.error = None;
        store.insert_log(&entry).await.unwrap();
        assert!(store.exists_sent_log(9, ChannelType::Slack, date).await.unwrap());
        assert!(!store.exists_sent_log(9, ChannelType::Email, date).await.unwrap());

        // The partial unique index refuses a second `sent` row for the key.
        assert!(store.insert_log(&entry).await.is_err());
        assert_eq!(store.logs_for_subscription(9).unwrap().len(), 2);
    }
}
