//! Calendar arithmetic for billing schedules.
//!
//! All functions work on calendar dates only. Month and year stepping clamps
//! the day-of-month to the target month's length: an anchor on the 31st lands
//! on the 30th or 28th/29th in shorter months, and a Feb 29 yearly anchor
//! resolves to Feb 28 in non-leap years.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Utc};
use renewly_core::types::{IntervalUnit, RecurrenceType, Subscription};

/// Strip time-of-day, keeping the UTC calendar date.
pub fn normalize_date(t: DateTime<Utc>) -> NaiveDate {
    t.date_naive()
}

/// The calendar date of `now` in the configured system timezone.
pub fn today_in(now: DateTime<Utc>, tz: FixedOffset) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Length of `month` in `year`, or 0 for a month outside 1..=12.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(31)
}

/// `min(day, days_in_month(year, month))`.
pub fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.min(days_in_month(year, month))
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, clamp_day(year, month, day).max(1))
}

/// Shift `anchor` by whole calendar months. chrono clamps the day to the
/// target month's length.
fn add_months_clamped(anchor: NaiveDate, months: i64) -> Option<NaiveDate> {
    let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        anchor.checked_add_months(step)
    } else {
        anchor.checked_sub_months(step)
    }
}

/// First date `>= from` in the sequence `anchor, anchor + step, anchor + 2·step, …`.
///
/// Month and year steps are always derived from `anchor` itself, never chained
/// from a previously clamped result, so the anchor's day-of-month is kept.
/// Returns `None` when `count` is zero or the result leaves chrono's range.
pub fn next_interval_occurrence(
    anchor: NaiveDate,
    from: NaiveDate,
    count: u32,
    unit: IntervalUnit,
) -> Option<NaiveDate> {
    if count == 0 {
        return None;
    }
    if anchor >= from {
        return Some(anchor);
    }

    match unit {
        IntervalUnit::Day | IntervalUnit::Week => {
            let step = count as i64 * if unit == IntervalUnit::Week { 7 } else { 1 };
            let gap = (from - anchor).num_days();
            let steps = (gap + step - 1) / step;
            anchor.checked_add_signed(Duration::days(steps * step))
        }
        IntervalUnit::Month | IntervalUnit::Year => {
            let step = count as i64 * if unit == IntervalUnit::Year { 12 } else { 1 };
            let months_between = (from.year() as i64 - anchor.year() as i64) * 12
                + from.month() as i64
                - anchor.month() as i64;
            // Every k below this lands in an earlier month than `from`.
            let mut k = months_between / step;
            loop {
                let candidate = add_months_clamped(anchor, k * step)?;
                if candidate >= from {
                    return Some(candidate);
                }
                k += 1;
            }
        }
    }
}

/// Next date `>= from` falling on `day` of the month (clamped).
pub fn next_monthly_day_occurrence(from: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }
    let this_month = clamped_date(from.year(), from.month(), day)?;
    if this_month >= from {
        return Some(this_month);
    }
    let (year, month) = if from.month() == 12 {
        (from.year() + 1, 1)
    } else {
        (from.year(), from.month() + 1)
    };
    clamped_date(year, month, day)
}

/// Next date `>= from` falling on `month`/`day` (clamped).
pub fn next_yearly_date_occurrence(from: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let this_year = clamped_date(from.year(), month, day)?;
    if this_year >= from {
        return Some(this_year);
    }
    clamped_date(from.year() + 1, month, day)
}

/// Whether a stored subscription carries a complete, usable recurrence.
pub fn has_valid_schedule(sub: &Subscription) -> bool {
    if !sub.is_recurring() || sub.next_occurrence.is_none() {
        return false;
    }
    match sub.recurrence_type {
        Some(RecurrenceType::Interval) => {
            sub.interval_count.is_some_and(|c| c >= 1) && sub.interval_unit.is_some()
        }
        Some(RecurrenceType::MonthlyDate) => sub.monthly_day.is_some_and(|d| (1..=31).contains(&d)),
        Some(RecurrenceType::YearlyDate) => {
            sub.yearly_month.is_some_and(|m| (1..=12).contains(&m))
                && sub.yearly_day.is_some_and(|d| (1..=31).contains(&d))
        }
        None => false,
    }
}

/// First occurrence of a recurring subscription `>= from`, anchored at the
/// stored `next_occurrence`. `None` for one-time subscriptions and invalid
/// schedules.
pub fn next_occurrence_on_or_after(sub: &Subscription, from: NaiveDate) -> Option<NaiveDate> {
    if !has_valid_schedule(sub) {
        return None;
    }
    let anchor = sub.next_occurrence?;
    match sub.recurrence_type? {
        RecurrenceType::Interval => {
            next_interval_occurrence(anchor, from, sub.interval_count?, sub.interval_unit?)
        }
        RecurrenceType::MonthlyDate if anchor >= from => Some(anchor),
        RecurrenceType::MonthlyDate => next_monthly_day_occurrence(from, sub.monthly_day?),
        RecurrenceType::YearlyDate if anchor >= from => Some(anchor),
        RecurrenceType::YearlyDate => {
            next_yearly_date_occurrence(from, sub.yearly_month?, sub.yearly_day?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 13), 0);
        assert_eq!(clamp_day(2025, 4, 31), 30);
        assert!(is_leap_year(2024) && !is_leap_year(2100));
    }

    #[test]
    fn test_month_shift_clamps_both_directions() {
        assert_eq!(add_months_clamped(d(2025, 1, 31), 1), Some(d(2025, 2, 28)));
        assert_eq!(add_months_clamped(d(2024, 2, 29), 12), Some(d(2025, 2, 28)));
        assert_eq!(add_months_clamped(d(2025, 3, 31), -1), Some(d(2025, 2, 28)));
        assert_eq!(add_months_clamped(d(2025, 11, 30), 3), Some(d(2026, 2, 28)));
        assert_eq!(add_months_clamped(d(2025, 5, 10), 0), Some(d(2025, 5, 10)));
    }

    #[test]
    fn test_monthly_interval_clamps_to_month_end() {
        let next = next_interval_occurrence(d(2025, 1, 31), d(2025, 2, 1), 1, IntervalUnit::Month);
        assert_eq!(next, Some(d(2025, 2, 28)));

        let leap = next_interval_occurrence(d(2024, 1, 31), d(2024, 2, 1), 1, IntervalUnit::Month);
        assert_eq!(leap, Some(d(2024, 2, 29)));

        // Back to the 31st once the month allows it.
        let march = next_interval_occurrence(d(2025, 1, 31), d(2025, 3, 1), 1, IntervalUnit::Month);
        assert_eq!(march, Some(d(2025, 3, 31)));
    }

    #[test]
    fn test_monthly_interval_keeps_phase() {
        let anchor = d(2025, 1, 15);
        let mut from = anchor;
        for _ in 0..36 {
            let next = next_interval_occurrence(anchor, from, 1, IntervalUnit::Month).unwrap();
            assert_eq!(next.day(), 15);
            from = next + Duration::days(1);
        }
    }

    #[test]
    fn test_clamped_day_never_exceeds_month_length() {
        let anchor = d(2023, 1, 31);
        let mut from = anchor;
        for _ in 0..48 {
            let next = next_interval_occurrence(anchor, from, 1, IntervalUnit::Month).unwrap();
            assert!(next.day() <= days_in_month(next.year(), next.month()));
            assert_eq!(next.day(), clamp_day(next.year(), next.month(), 31));
            from = next + Duration::days(1);
        }
    }

    #[test]
    fn test_anchor_not_before_from_is_returned() {
        let anchor = d(2026, 5, 10);
        assert_eq!(
            next_interval_occurrence(anchor, d(2026, 5, 1), 3, IntervalUnit::Week),
            Some(anchor)
        );
        assert_eq!(
            next_interval_occurrence(anchor, anchor, 1, IntervalUnit::Day),
            Some(anchor)
        );
    }

    #[test]
    fn test_day_and_week_stepping() {
        assert_eq!(
            next_interval_occurrence(d(2026, 1, 1), d(2026, 1, 8), 3, IntervalUnit::Day),
            Some(d(2026, 1, 10))
        );
        assert_eq!(
            next_interval_occurrence(d(2026, 2, 10), d(2026, 3, 1), 2, IntervalUnit::Week),
            Some(d(2026, 3, 10))
        );
    }

    #[test]
    fn test_multi_month_and_year_steps() {
        // Quarterly from Nov 30: Feb 28, May 30.
        assert_eq!(
            next_interval_occurrence(d(2025, 11, 30), d(2026, 1, 1), 3, IntervalUnit::Month),
            Some(d(2026, 2, 28))
        );
        assert_eq!(
            next_interval_occurrence(d(2025, 11, 30), d(2026, 3, 1), 3, IntervalUnit::Month),
            Some(d(2026, 5, 30))
        );
        assert_eq!(
            next_interval_occurrence(d(2024, 2, 29), d(2024, 3, 1), 1, IntervalUnit::Year),
            Some(d(2025, 2, 28))
        );
        assert_eq!(
            next_interval_occurrence(d(2024, 2, 29), d(2027, 3, 1), 2, IntervalUnit::Year),
            Some(d(2028, 2, 29))
        );
    }

    #[test]
    fn test_zero_count_is_invalid() {
        assert_eq!(
            next_interval_occurrence(d(2026, 1, 1), d(2026, 2, 1), 0, IntervalUnit::Day),
            None
        );
    }

    #[test]
    fn test_monthly_day_occurrence() {
        assert_eq!(next_monthly_day_occurrence(d(2026, 2, 1), 31), Some(d(2026, 2, 28)));
        assert_eq!(next_monthly_day_occurrence(d(2026, 2, 20), 15), Some(d(2026, 3, 15)));
        assert_eq!(next_monthly_day_occurrence(d(2026, 12, 20), 5), Some(d(2027, 1, 5)));
        assert_eq!(next_monthly_day_occurrence(d(2026, 3, 15), 15), Some(d(2026, 3, 15)));
        assert_eq!(next_monthly_day_occurrence(d(2026, 3, 15), 0), None);
    }

    #[test]
    fn test_yearly_date_occurrence() {
        assert_eq!(next_yearly_date_occurrence(d(2025, 1, 1), 2, 29), Some(d(2025, 2, 28)));
        assert_eq!(next_yearly_date_occurrence(d(2027, 3, 1), 2, 29), Some(d(2028, 2, 29)));
        assert_eq!(next_yearly_date_occurrence(d(2026, 7, 1), 6, 30), Some(d(2027, 6, 30)));
        assert_eq!(next_yearly_date_occurrence(d(2026, 7, 1), 13, 1), None);
    }

    #[test]
    fn test_today_in_offset() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T20:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let east = FixedOffset::east_opt(8 * 3600).unwrap();
        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(today_in(now, east), d(2026, 3, 2));
        assert_eq!(today_in(now, west), d(2026, 3, 1));
        assert_eq!(normalize_date(now), d(2026, 3, 1));
    }

    #[test]
    fn test_next_on_or_after_requires_valid_schedule() {
        let mut sub = Subscription::new(1, "gym", 30.0, "USD");
        sub.next_occurrence = Some(d(2026, 1, 31));
        sub.recurrence_type = Some(RecurrenceType::MonthlyDate);
        assert_eq!(next_occurrence_on_or_after(&sub, d(2026, 2, 2)), None);

        sub.monthly_day = Some(31);
        assert_eq!(next_occurrence_on_or_after(&sub, d(2026, 2, 2)), Some(d(2026, 2, 28)));
        assert_eq!(next_occurrence_on_or_after(&sub, d(2026, 1, 2)), Some(d(2026, 1, 31)));
    }
}
