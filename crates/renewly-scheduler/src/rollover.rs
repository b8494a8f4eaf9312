//! Rollover: fast-forwards stale `next_occurrence` values.
//!
//! Called at the top of every read path that needs an accurate schedule.
//! Safe to call repeatedly: a subscription that is already current is not
//! written.

use chrono::NaiveDate;
use renewly_core::error::Result;
use renewly_core::traits::Store;

use crate::schedule::next_occurrence_on_or_after;

/// Advance every overdue recurring subscription of `user_id` to its first
/// occurrence on or after `today`. Returns the number of rows written.
///
/// One-time subscriptions are never touched.
pub async fn advance_user(store: &dyn Store, user_id: i64, today: NaiveDate) -> Result<usize> {
    let overdue = store.find_overdue_recurring(user_id, today).await?;
    let mut advanced = 0;

    for sub in overdue {
        let Some(stored) = sub.next_occurrence else {
            continue;
        };
        let Some(next) = next_occurrence_on_or_after(&sub, today) else {
            tracing::warn!(
                "⚠️ Subscription {} ('{}') has an invalid schedule, not advancing",
                sub.id,
                sub.name
            );
            continue;
        };
        if next <= stored {
            continue;
        }
        store.update_next_occurrence(sub.id, next).await?;
        tracing::debug!("⏩ Subscription {} advanced {} → {}", sub.id, stored, next);
        advanced += 1;
    }

    if advanced > 0 {
        tracing::info!("⏩ Advanced {} subscription(s) for user {}", advanced, user_id);
    }
    Ok(advanced)
}
