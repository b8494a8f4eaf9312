//! Reminder policy resolution: subscription overrides over user defaults.

use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::Store;
use renewly_core::types::{NotificationPolicy, Subscription};
use serde::{Deserialize, Serialize};

/// The policy actually applied to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectivePolicy {
    pub days_before: u32,
    pub notify_on_due_day: bool,
    pub notify_enabled: bool,
}

impl EffectivePolicy {
    /// Whether a reminder is due when the charge is `days_until` days away.
    ///
    /// Exact equality: a day missed while the scheduler was down is not
    /// reported late.
    pub fn is_due(&self, days_until: i64) -> bool {
        if !self.notify_enabled {
            return false;
        }
        let ahead = self.days_before > 0 && days_until == self.days_before as i64;
        let on_day = days_until == 0 && self.notify_on_due_day;
        ahead || on_day
    }
}

/// Subscription overrides win; otherwise the user's policy, or the defaults.
/// Lead time is capped at [`NotificationPolicy::MAX_DAYS_BEFORE`].
pub fn resolve(sub: &Subscription, user_policy: Option<&NotificationPolicy>) -> EffectivePolicy {
    let base = user_policy
        .cloned()
        .unwrap_or_else(|| NotificationPolicy::default_for(sub.user_id));
    EffectivePolicy {
        days_before: sub
            .notify_days_before
            .unwrap_or(base.days_before)
            .min(NotificationPolicy::MAX_DAYS_BEFORE),
        notify_on_due_day: base.notify_on_due_day,
        notify_enabled: sub.notify_enabled.unwrap_or(true),
    }
}

/// Partial policy update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyUpdate {
    pub days_before: Option<i64>,
    pub notify_on_due_day: Option<bool>,
}

/// Validate and persist a policy update, creating the row on first write.
pub async fn update_policy(
    store: &dyn Store,
    user_id: i64,
    update: PolicyUpdate,
) -> Result<NotificationPolicy> {
    let days_before = match update.days_before {
        Some(days) if !(0..=NotificationPolicy::MAX_DAYS_BEFORE as i64).contains(&days) => {
            return Err(RenewlyError::Validation(format!(
                "days_before must be between 0 and {}, got {days}",
                NotificationPolicy::MAX_DAYS_BEFORE
            )));
        }
        Some(days) => Some(days as u32),
        None => None,
    };

    let mut policy = store
        .find_policy(user_id)
        .await?
        .unwrap_or_else(|| NotificationPolicy::default_for(user_id));
    if let Some(days) = days_before {
        policy.days_before = days;
    }
    if let Some(on_day) = update.notify_on_due_day {
        policy.notify_on_due_day = on_day;
    }

    store.upsert_policy(&policy).await?;
    tracing::info!(
        "🔔 Policy updated for user {}: {} day(s) before, due-day={}",
        user_id,
        policy.days_before,
        policy.notify_on_due_day
    );
    Ok(policy)
}
