//! Scheduler engine: decides which reminders are due and hands them to the
//! dispatch pool.
//!
//! One tick: list users with enabled channels, then for each user (at most
//! `user_concurrency` at a time) run
//! advance → collect candidates → build jobs → dispatch.
//! A failing user is logged and skipped; the others carry on.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use renewly_core::config::RenewlyConfig;
use renewly_core::error::Result;
use renewly_core::traits::{ChannelSender, Store, TemplateRenderer};
use renewly_core::types::ChannelType;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::dispatch::{DispatchJob, DispatchPool, DispatchStats};
use crate::policy;
use crate::rollover;
use crate::schedule::today_in;
use crate::template::{reminder_fields, validate_template};

/// What happened for a single user during one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserReport {
    /// Rows rewritten by the rollover step.
    pub advanced: usize,
    /// Subscriptions with a reminder due today.
    pub due: usize,
    /// Candidates skipped because a `sent` row already exists.
    pub already_sent: usize,
    pub render_failures: usize,
    pub dispatch: DispatchStats,
}

/// Totals for one tick across all users.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub users: usize,
    pub users_failed: usize,
    pub advanced: usize,
    pub due: usize,
    pub already_sent: usize,
    pub render_failures: usize,
    pub dispatch: DispatchStats,
}

impl TickReport {
    fn absorb(&mut self, user: UserReport) {
        self.advanced += user.advanced;
        self.due += user.due;
        self.already_sent += user.already_sent;
        self.render_failures += user.render_failures;
        self.dispatch += user.dispatch;
    }

    fn merge(&mut self, other: TickReport) {
        self.users_failed += other.users_failed;
        self.advanced += other.advanced;
        self.due += other.due;
        self.already_sent += other.already_sent;
        self.render_failures += other.render_failures;
        self.dispatch += other.dispatch;
    }
}

/// The reminder scheduler. Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct SchedulerEngine {
    store: Arc<dyn Store>,
    renderer: Arc<dyn TemplateRenderer>,
    pool: DispatchPool,
    timezone: FixedOffset,
    user_concurrency: usize,
    default_template: Arc<str>,
}

impl SchedulerEngine {
    pub fn new(
        config: &RenewlyConfig,
        store: Arc<dyn Store>,
        sender: Arc<dyn ChannelSender>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Result<Self> {
        config.validate()?;
        validate_template(&config.notify.default_template)?;
        let sched = &config.scheduler;
        Ok(Self {
            pool: DispatchPool::new(
                sender,
                store.clone(),
                sched.job_concurrency,
                Duration::from_secs(sched.send_timeout_secs),
            ),
            store,
            renderer,
            timezone: sched.timezone()?,
            user_concurrency: sched.user_concurrency.max(1),
            default_template: config.notify.default_template.as_str().into(),
        })
    }

    /// Today's date in the configured system timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        today_in(now, self.timezone)
    }

    /// Run one scheduling tick. Returns after every user has been processed.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        let today = self.today(now);
        let mut report = TickReport::default();

        let users = match self.store.list_users_with_enabled_channels().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!("⚠️ Tick aborted, cannot list users: {e}");
                return report;
            }
        };
        if users.is_empty() {
            tracing::debug!("⏰ Tick {}: no users with enabled channels", today);
            return report;
        }

        report.users = users.len();
        let workers = users.len().min(self.user_concurrency);
        let queue = Arc::new(Mutex::new(VecDeque::from(users)));

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let queue = queue.clone();
            let engine = self.clone();
            set.spawn(async move {
                let mut partial = TickReport::default();
                loop {
                    let user = queue.lock().await.pop_front();
                    let Some(user_id) = user else { break };
                    match engine.run_user(user_id, today).await {
                        Ok(user_report) => partial.absorb(user_report),
                        Err(e) => {
                            tracing::warn!("⚠️ Skipping user {user_id} this tick: {e}");
                            partial.users_failed += 1;
                        }
                    }
                }
                partial
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(partial) => report.merge(partial),
                Err(e) => tracing::warn!("⚠️ User worker aborted: {e}"),
            }
        }

        tracing::info!(
            "⏰ Tick {} done: {} user(s), {} sent, {} failed, {} advanced",
            today,
            report.users,
            report.dispatch.sent,
            report.dispatch.failed,
            report.advanced
        );
        report
    }

    /// Process one user for `today`.
    pub async fn run_user(&self, user_id: i64, today: NaiveDate) -> Result<UserReport> {
        let mut report = UserReport {
            advanced: rollover::advance_user(self.store.as_ref(), user_id, today).await?,
            ..Default::default()
        };

        let channels = self.store.find_enabled_channels(user_id).await?;
        if channels.is_empty() {
            return Ok(report);
        }
        let subscriptions = self.store.find_notifiable_subscriptions(user_id).await?;
        let user_policy = self.store.find_policy(user_id).await?;
        let user_email = self.store.find_user_email(user_id).await?.unwrap_or_default();

        let mut seen: HashSet<(i64, ChannelType, NaiveDate)> = HashSet::new();
        let mut jobs = Vec::new();

        for sub in &subscriptions {
            let Some(billing_date) = sub.next_occurrence else {
                continue;
            };
            let effective = policy::resolve(sub, user_policy.as_ref());
            let days_until = (billing_date - today).num_days();
            if !effective.is_due(days_until) {
                continue;
            }
            report.due += 1;

            let fields = reminder_fields(sub, billing_date, days_until, &user_email);
            for channel in &channels {
                let key = (sub.id, channel.channel_type, billing_date);
                if !seen.insert(key) {
                    continue;
                }
                if self
                    .store
                    .exists_sent_log(sub.id, channel.channel_type, billing_date)
                    .await?
                {
                    report.already_sent += 1;
                    continue;
                }

                let template = channel.template.as_deref().unwrap_or(&*self.default_template);
                let message = match self.renderer.render(template, &fields) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Cannot render reminder for subscription {} via {}: {}",
                            sub.id,
                            channel.channel_type,
                            e
                        );
                        report.render_failures += 1;
                        continue;
                    }
                };

                jobs.push(DispatchJob {
                    subscription_id: sub.id,
                    user_id,
                    channel: channel.clone(),
                    notify_date: billing_date,
                    message,
                    target_hint: user_email.clone(),
                });
            }
        }

        if !jobs.is_empty() {
            tracing::debug!("📤 User {}: dispatching {} reminder(s)", user_id, jobs.len());
            report.dispatch = self.pool.run(jobs).await;
        }
        Ok(report)
    }
}

/// Run ticks forever on a fixed interval.
pub async fn spawn_scheduler(engine: SchedulerEngine, check_interval_secs: u64) {
    tracing::info!(
        "⏰ Scheduler started (check every {}s)",
        check_interval_secs
    );

    let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        engine.run_tick(Utc::now()).await;
    }
}
