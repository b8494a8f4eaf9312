//! Dashboard summary: spend per currency for one user.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::Store;
use serde::Serialize;

use crate::occurrence::{count_occurrences_in_range, monthly_factor};
use crate::rollover;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CurrencySummary {
    /// Recurring spend amortized to one month.
    pub monthly_total: f64,
    /// Billing events falling in the current calendar month.
    pub due_this_month: u32,
    pub due_this_month_amount: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub active_subscriptions: usize,
    pub by_currency: BTreeMap<String, CurrencySummary>,
}

/// First day of `today`'s month and of the following month.
fn month_bounds(today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = today.with_day(1);
    let end = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    };
    start
        .zip(end)
        .ok_or_else(|| RenewlyError::Validation(format!("no month bounds for {today}")))
}

/// Advance stale schedules, then total the user's enabled subscriptions.
pub async fn dashboard_summary(
    store: &dyn Store,
    user_id: i64,
    today: NaiveDate,
) -> Result<DashboardSummary> {
    rollover::advance_user(store, user_id, today).await?;
    let (start, end) = month_bounds(today)?;

    let mut summary = DashboardSummary::default();
    for sub in store.find_subscriptions(user_id).await? {
        if !sub.enabled {
            continue;
        }
        summary.active_subscriptions += 1;
        let entry = summary.by_currency.entry(sub.currency.clone()).or_default();
        if sub.is_recurring() {
            entry.monthly_total += sub.amount * monthly_factor(&sub);
        }
        let due = count_occurrences_in_range(&sub, start, end);
        entry.due_this_month += due;
        entry.due_this_month_amount += sub.amount * f64::from(due);
    }
    Ok(summary)
}
