//! Reminder message templates.
//!
//! Templates use `{{field}}` placeholders drawn from a fixed whitelist.
//! Anything else is rejected, both when a template is saved and when it is
//! rendered.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use renewly_core::error::{RenewlyError, Result};
use renewly_core::traits::TemplateRenderer;
use renewly_core::types::Subscription;

/// Every placeholder a template may reference.
pub const TEMPLATE_FIELDS: [&str; 10] = [
    "name",
    "amount",
    "currency",
    "days_until",
    "category",
    "payment_method",
    "url",
    "remark",
    "billing_date",
    "user_email",
];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Check that `template` only references whitelisted fields.
pub fn validate_template(template: &str) -> Result<()> {
    for caps in PLACEHOLDER.captures_iter(template) {
        let key = &caps[1];
        if !TEMPLATE_FIELDS.contains(&key) {
            return Err(RenewlyError::Template(format!("unknown placeholder '{{{{{key}}}}}'")));
        }
    }
    Ok(())
}

/// Substitution values for one reminder.
pub fn reminder_fields(
    sub: &Subscription,
    billing_date: NaiveDate,
    days_until: i64,
    user_email: &str,
) -> HashMap<&'static str, String> {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    HashMap::from([
        ("name", sub.name.clone()),
        ("amount", format!("{:.2}", sub.amount)),
        ("currency", sub.currency.clone()),
        ("days_until", days_until.to_string()),
        ("category", opt(&sub.category)),
        ("payment_method", opt(&sub.payment_method)),
        ("url", opt(&sub.url)),
        ("remark", opt(&sub.remark)),
        ("billing_date", billing_date.format("%Y-%m-%d").to_string()),
        ("user_email", user_email.to_string()),
    ])
}

/// `{{field}}` substitution renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, fields: &HashMap<&'static str, String>) -> Result<String> {
        validate_template(template)?;
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            fields.get(&caps[1]).cloned().unwrap_or_default()
        });
        let rendered = rendered.trim();
        if rendered.is_empty() {
            return Err(RenewlyError::Template("template rendered to an empty message".into()));
        }
        Ok(rendered.to_string())
    }
}
