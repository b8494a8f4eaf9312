//! Occurrence counting for dashboards and summaries.

use chrono::{Duration, NaiveDate};
use renewly_core::types::{BillingType, IntervalUnit, RecurrenceType, Subscription};

use crate::schedule::{has_valid_schedule, next_occurrence_on_or_after};

/// Number of times `sub` bills in `[start, end)`.
///
/// Walks the schedule one occurrence at a time, so cost grows with the
/// number of occurrences in range. Malformed schedules count as zero.
pub fn count_occurrences_in_range(sub: &Subscription, start: NaiveDate, end: NaiveDate) -> u32 {
    if start >= end {
        return 0;
    }
    match sub.billing_type {
        BillingType::OneTime => match sub.next_occurrence {
            Some(date) if date >= start && date < end => 1,
            _ => 0,
        },
        BillingType::Recurring => {
            if !has_valid_schedule(sub) {
                return 0;
            }
            let mut count = 0;
            let mut current = next_occurrence_on_or_after(sub, start);
            while let Some(date) = current {
                if date >= end {
                    break;
                }
                count += 1;
                current = date
                    .checked_add_signed(Duration::days(1))
                    .and_then(|next_day| next_occurrence_on_or_after(sub, next_day));
            }
            count
        }
    }
}

/// Amortized occurrences per month, used to fold recurring charges into a
/// monthly total. Zero means "not a recurring total; count by date range".
pub fn monthly_factor(sub: &Subscription) -> f64 {
    if !has_valid_schedule(sub) {
        return 0.0;
    }
    match sub.recurrence_type {
        Some(RecurrenceType::Interval) => {
            let (Some(count), Some(unit)) = (sub.interval_count, sub.interval_unit) else {
                return 0.0;
            };
            let per_month = match unit {
                IntervalUnit::Day => 365.0 / 12.0,
                IntervalUnit::Week => 52.0 / 12.0,
                IntervalUnit::Month => 1.0,
                IntervalUnit::Year => 1.0 / 12.0,
            };
            per_month / count as f64
        }
        Some(RecurrenceType::MonthlyDate) => 1.0,
        Some(RecurrenceType::YearlyDate) => 1.0 / 12.0,
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn interval(anchor: NaiveDate, count: u32, unit: IntervalUnit) -> Subscription {
        let mut sub = Subscription::new(1, "svc", 10.0, "USD");
        sub.recurrence_type = Some(RecurrenceType::Interval);
        sub.interval_count = Some(count);
        sub.interval_unit = Some(unit);
        sub.next_occurrence = Some(anchor);
        sub
    }

    #[test]
    fn test_weekly_in_february() {
        let sub = interval(d(2026, 2, 10), 1, IntervalUnit::Week);
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 2, 1), d(2026, 3, 1)), 3);
    }

    #[test]
    fn test_monthly_day_31_in_february() {
        let mut sub = Subscription::new(1, "svc", 10.0, "USD");
        sub.recurrence_type = Some(RecurrenceType::MonthlyDate);
        sub.monthly_day = Some(31);
        sub.next_occurrence = Some(d(2026, 1, 31));
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 2, 1), d(2026, 3, 1)), 1);
        // Jan 31 plus Feb 28.
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 1, 1), d(2026, 3, 1)), 2);
    }

    #[test]
    fn test_anchor_inside_range_is_first_occurrence() {
        let sub = interval(d(2026, 2, 20), 1, IntervalUnit::Day);
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 2, 1), d(2026, 3, 1)), 9);
    }

    #[test]
    fn test_end_is_exclusive() {
        let sub = interval(d(2026, 3, 1), 1, IntervalUnit::Month);
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 2, 1), d(2026, 3, 1)), 0);
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 3, 1), d(2026, 3, 2)), 1);
    }

    #[test]
    fn test_month_end_anchor_over_a_year() {
        let sub = interval(d(2025, 1, 31), 1, IntervalUnit::Month);
        assert_eq!(count_occurrences_in_range(&sub, d(2025, 1, 1), d(2026, 1, 1)), 12);
    }

    #[test]
    fn test_one_time() {
        let mut sub = Subscription::new(1, "course", 99.0, "USD");
        sub.billing_type = BillingType::OneTime;
        sub.next_occurrence = Some(d(2026, 2, 14));
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 2, 1), d(2026, 3, 1)), 1);
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 3, 1), d(2026, 4, 1)), 0);
        assert_eq!(monthly_factor(&sub), 0.0);
    }

    #[test]
    fn test_malformed_schedule_counts_zero() {
        let mut sub = interval(d(2026, 2, 10), 1, IntervalUnit::Week);
        sub.interval_unit = None;
        assert_eq!(count_occurrences_in_range(&sub, d(2026, 2, 1), d(2026, 3, 1)), 0);
        assert_eq!(monthly_factor(&sub), 0.0);
    }

    #[test]
    fn test_monthly_factor() {
        let weekly = interval(d(2026, 1, 1), 1, IntervalUnit::Week);
        assert!((monthly_factor(&weekly) - 52.0 / 12.0).abs() < 1e-9);
        let biweekly = interval(d(2026, 1, 1), 2, IntervalUnit::Week);
        assert!((monthly_factor(&biweekly) - 26.0 / 12.0).abs() < 1e-9);
        let yearly = interval(d(2026, 1, 1), 1, IntervalUnit::Year);
        assert!((monthly_factor(&yearly) - 1.0 / 12.0).abs() < 1e-9);
        let quarterly = interval(d(2026, 1, 1), 3, IntervalUnit::Month);
        assert!((monthly_factor(&quarterly) - 1.0 / 3.0).abs() < 1e-9);
    }
}
