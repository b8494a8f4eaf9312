//! Notification dispatch: bounded fan-out of reminder jobs to channel senders.
//!
//! Jobs sit in a shared queue drained by a fixed number of workers. Every job
//! produces exactly one log row; nothing is retried here. The next tick picks
//! up failures on its own because only `sent` rows block a resend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use renewly_core::error::RenewlyError;
use renewly_core::traits::{ChannelSender, Store};
use renewly_core::types::{LogStatus, NotificationChannel, NotificationLog};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// One rendered reminder for one channel.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub subscription_id: i64,
    pub user_id: i64,
    pub channel: NotificationChannel,
    /// The occurrence date this reminder is about (dedup key component).
    pub notify_date: NaiveDate,
    pub message: String,
    pub target_hint: String,
}

/// Outcome counters for one pool run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub sent: usize,
    pub failed: usize,
    /// Log rows that could not be written.
    pub log_errors: usize,
}

impl std::ops::AddAssign for DispatchStats {
    fn add_assign(&mut self, other: DispatchStats) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.log_errors += other.log_errors;
    }
}

/// Worker pool settings plus the collaborators each worker needs.
#[derive(Clone)]
pub struct DispatchPool {
    sender: Arc<dyn ChannelSender>,
    store: Arc<dyn Store>,
    concurrency: usize,
    send_timeout: Duration,
}

impl DispatchPool {
    pub fn new(
        sender: Arc<dyn ChannelSender>,
        store: Arc<dyn Store>,
        concurrency: usize,
        send_timeout: Duration,
    ) -> Self {
        Self {
            sender,
            store,
            concurrency: concurrency.max(1),
            send_timeout,
        }
    }

    /// Send every job with at most `min(jobs, concurrency)` in flight.
    /// Returns once all workers have finished.
    pub async fn run(&self, jobs: Vec<DispatchJob>) -> DispatchStats {
        if jobs.is_empty() {
            return DispatchStats::default();
        }
        let workers = jobs.len().min(self.concurrency);
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let queue = queue.clone();
            let pool = self.clone();
            set.spawn(async move {
                let mut stats = DispatchStats::default();
                loop {
                    let job = queue.lock().await.pop_front();
                    let Some(job) = job else { break };
                    stats += pool.process(job).await;
                }
                stats
            });
        }

        let mut total = DispatchStats::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(stats) => total += stats,
                Err(e) => tracing::warn!("⚠️ Dispatch worker aborted: {e}"),
            }
        }
        total
    }

    async fn process(&self, job: DispatchJob) -> DispatchStats {
        let channel_type = job.channel.channel_type;
        let outcome = match tokio::time::timeout(
            self.send_timeout,
            self.sender.send(&job.channel, &job.message, &job.target_hint),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RenewlyError::Channel(format!(
                "send timed out after {}s",
                self.send_timeout.as_secs()
            ))),
        };

        let mut stats = DispatchStats::default();
        let (status, error) = match outcome {
            Ok(()) => {
                tracing::debug!(
                    "✅ Reminder sent: subscription {} via {}",
                    job.subscription_id,
                    channel_type
                );
                stats.sent = 1;
                (LogStatus::Sent, None)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Reminder failed: subscription {} via {}: {}",
                    job.subscription_id,
                    channel_type,
                    e
                );
                stats.failed = 1;
                (LogStatus::Failed, Some(e.to_string()))
            }
        };

        let entry = NotificationLog {
            subscription_id: job.subscription_id,
            user_id: job.user_id,
            channel_type,
            notify_date: job.notify_date,
            status,
            error,
            sent_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_log(&entry).await {
            tracing::warn!(
                "⚠️ Failed to record delivery for subscription {}: {}",
                job.subscription_id,
                e
            );
            stats.log_errors = 1;
        }
        stats
    }
}
