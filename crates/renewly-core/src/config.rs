//! Renewly configuration system.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RenewlyError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenewlyConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl RenewlyConfig {
    /// Load config from the default path (~/.renewly/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RenewlyError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RenewlyError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RenewlyError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        if s.user_concurrency == 0 || s.job_concurrency == 0 {
            return Err(RenewlyError::Config(
                "scheduler concurrency must be at least 1".into(),
            ));
        }
        if s.tick_interval_secs == 0 {
            return Err(RenewlyError::Config("tick_interval_secs must be positive".into()));
        }
        s.timezone()?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Renewly home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".renewly")
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.renewly/renewly.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Scheduling loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Users processed concurrently per tick.
    #[serde(default = "default_concurrency")]
    pub user_concurrency: usize,
    /// Notification jobs sent concurrently per user.
    #[serde(default = "default_concurrency")]
    pub job_concurrency: usize,
    /// The system timezone, as a fixed offset from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_tick_interval() -> u64 { 3600 }
fn default_concurrency() -> usize { 4 }
fn default_send_timeout() -> u64 { 10 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            user_concurrency: default_concurrency(),
            job_concurrency: default_concurrency(),
            utc_offset_minutes: 0,
            send_timeout_secs: default_send_timeout(),
        }
    }
}

impl SchedulerConfig {
    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            RenewlyError::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

/// Notification rendering defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_template")]
    pub default_template: String,
}

fn default_template() -> String {
    "Reminder: {{name}} renews on {{billing_date}} ({{days_until}} days) for {{amount}} {{currency}}."
        .into()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { default_template: default_template() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = RenewlyConfig::from_toml("").unwrap();
        assert_eq!(config.scheduler.user_concurrency, 4);
        assert_eq!(config.scheduler.job_concurrency, 4);
        assert_eq!(config.scheduler.tick_interval_secs, 3600);
        assert!(config.notify.default_template.contains("{{name}}"));
    }

    #[test]
    fn test_partial_section() {
        let config = RenewlyConfig::from_toml(
            "[scheduler]\nutc_offset_minutes = 480\njob_concurrency = 2\n",
        )
        .unwrap();
        assert_eq!(config.scheduler.job_concurrency, 2);
        assert_eq!(config.scheduler.user_concurrency, 4);
        assert_eq!(config.scheduler.timezone().unwrap().local_minus_utc(), 480 * 60);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = RenewlyConfig::from_toml("[scheduler]\nuser_concurrency = 0\n").unwrap_err();
        assert!(matches!(err, RenewlyError::Config(_)));
    }

    #[test]
    fn test_rejects_offset_out_of_range() {
        assert!(RenewlyConfig::from_toml("[scheduler]\nutc_offset_minutes = 2000\n").is_err());
    }
}
