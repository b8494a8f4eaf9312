//! Billing draft normalization: validates a proposed billing configuration
//! and brings it into its canonical, persistable shape.

use chrono::{DateTime, NaiveDate, Utc};
use renewly_core::error::{RenewlyError, Result};
use renewly_core::types::{BillingType, IntervalUnit, RecurrenceType, Subscription};
use serde::{Deserialize, Serialize};

use crate::schedule::normalize_date;

/// Billing fields as submitted by a caller, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingDraft {
    pub billing_type: String,
    #[serde(default)]
    pub recurrence_type: Option<String>,
    #[serde(default)]
    pub interval_count: Option<i64>,
    #[serde(default)]
    pub interval_unit: Option<String>,
    #[serde(default)]
    pub monthly_day: Option<i64>,
    #[serde(default)]
    pub yearly_month: Option<i64>,
    #[serde(default)]
    pub yearly_day: Option<i64>,
    #[serde(default)]
    pub next_occurrence: Option<DateTime<Utc>>,
}

/// A validated billing configuration. Only the field set belonging to
/// `recurrence_type` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBilling {
    pub billing_type: BillingType,
    pub recurrence_type: Option<RecurrenceType>,
    pub interval_count: Option<u32>,
    pub interval_unit: Option<IntervalUnit>,
    pub monthly_day: Option<u32>,
    pub yearly_month: Option<u32>,
    pub yearly_day: Option<u32>,
    /// The submitted date with time-of-day stripped. Never advanced here.
    pub next_occurrence: NaiveDate,
}

impl NormalizedBilling {
    fn cleared(billing_type: BillingType, next_occurrence: NaiveDate) -> Self {
        Self {
            billing_type,
            recurrence_type: None,
            interval_count: None,
            interval_unit: None,
            monthly_day: None,
            yearly_month: None,
            yearly_day: None,
            next_occurrence,
        }
    }

    /// Overwrite every billing field of `sub` with this configuration.
    pub fn apply_to(&self, sub: &mut Subscription) {
        sub.billing_type = self.billing_type;
        sub.recurrence_type = self.recurrence_type;
        sub.interval_count = self.interval_count;
        sub.interval_unit = self.interval_unit;
        sub.monthly_day = self.monthly_day;
        sub.yearly_month = self.yearly_month;
        sub.yearly_day = self.yearly_day;
        sub.next_occurrence = Some(self.next_occurrence);
    }
}

fn in_range(value: Option<i64>, min: i64, max: i64) -> Option<u32> {
    value.filter(|v| (min..=max).contains(v)).map(|v| v as u32)
}

/// Validate and canonicalize a billing draft.
pub fn normalize(draft: &BillingDraft) -> Result<NormalizedBilling> {
    let billing_type = BillingType::parse(draft.billing_type.trim()).ok_or_else(|| {
        RenewlyError::Validation(format!("unknown billing type '{}'", draft.billing_type))
    })?;

    match billing_type {
        BillingType::OneTime => {
            let date = draft.next_occurrence.ok_or_else(|| {
                RenewlyError::Validation(
                    "billing date is required for one-time subscriptions".into(),
                )
            })?;
            Ok(NormalizedBilling::cleared(BillingType::OneTime, normalize_date(date)))
        }
        BillingType::Recurring => {
            let date = draft.next_occurrence.ok_or_else(|| {
                RenewlyError::Validation(
                    "next billing date is required for recurring subscriptions".into(),
                )
            })?;
            normalize_recurring(draft, normalize_date(date))
        }
    }
}

fn normalize_recurring(draft: &BillingDraft, next_occurrence: NaiveDate) -> Result<NormalizedBilling> {
    let raw = draft.recurrence_type.as_deref().map(str::trim).unwrap_or("");
    let recurrence = if raw.is_empty() {
        RecurrenceType::Interval
    } else {
        RecurrenceType::parse(raw).ok_or_else(|| {
            RenewlyError::Validation(format!("unknown recurrence type '{raw}'"))
        })?
    };

    let mut out = NormalizedBilling::cleared(BillingType::Recurring, next_occurrence);
    out.recurrence_type = Some(recurrence);

    match recurrence {
        RecurrenceType::Interval => {
            out.interval_count = Some(in_range(draft.interval_count, 1, u32::MAX as i64).ok_or_else(
                || RenewlyError::Validation("interval count must be at least 1".into()),
            )?);
            out.interval_unit = Some(
                draft
                    .interval_unit
                    .as_deref()
                    .and_then(|u| IntervalUnit::parse(u.trim()))
                    .ok_or_else(|| {
                        RenewlyError::Validation(
                            "interval unit must be one of day, week, month, year".into(),
                        )
                    })?,
            );
        }
        RecurrenceType::MonthlyDate => {
            out.monthly_day = Some(in_range(draft.monthly_day, 1, 31).ok_or_else(|| {
                RenewlyError::Validation("monthly day must be between 1 and 31".into())
            })?);
        }
        RecurrenceType::YearlyDate => {
            out.yearly_month = Some(in_range(draft.yearly_month, 1, 12).ok_or_else(|| {
                RenewlyError::Validation("yearly month must be between 1 and 12".into())
            })?);
            out.yearly_day = Some(in_range(draft.yearly_day, 1, 31).ok_or_else(|| {
                RenewlyError::Validation("yearly day must be between 1 and 31".into())
            })?);
        }
    }

    Ok(out)
}
