//! # Renewly Scheduler
//!
//! Billing schedule engine plus the reminder scheduler that sits on top of it.
//!
//! ## Design Principles
//! - Pure date math: every occurrence is derived from the stored anchor
//! - SQLite persistence: the delivery log survives restarts and blocks resends
//! - Tokio timers only: zero overhead between ticks
//! - Bounded fan-out: a fixed number of users and sends in flight
//!
//! ## Architecture
//! ```text
//! Scheduler tick (tokio interval)
//!   └── for each user with enabled channels (≤ user_concurrency)
//!         ├── Rollover: stale next_occurrence → first date ≥ today
//!         ├── Policy: subscription override → user policy → default
//!         ├── Due check: days_until == days_before, or due day
//!         ├── Dedup: in-tick key set + `sent` row in the log
//!         ├── Render: channel template or default template
//!         └── DispatchPool (≤ job_concurrency)
//!               └── ChannelSender → one log row per job
//! ```

pub mod dispatch;
pub mod draft;
pub mod engine;
pub mod occurrence;
pub mod persistence;
pub mod policy;
pub mod rollover;
pub mod schedule;
pub mod summary;
pub mod template;

pub use dispatch::{DispatchJob, DispatchPool, DispatchStats};
pub use draft::{BillingDraft, NormalizedBilling, normalize};
pub use engine::{SchedulerEngine, TickReport, UserReport, spawn_scheduler};
pub use occurrence::{count_occurrences_in_range, monthly_factor};
pub use persistence::SqliteStore;
pub use policy::{EffectivePolicy, PolicyUpdate, update_policy};
pub use rollover::advance_user;
pub use schedule::{next_occurrence_on_or_after, today_in};
pub use summary::{CurrencySummary, DashboardSummary, dashboard_summary};
pub use template::{PlaceholderRenderer, validate_template};
