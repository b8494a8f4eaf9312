//! # Renewly Core
//!
//! Shared domain types, the error type, configuration loading and the
//! collaborator traits (`Store`, `ChannelSender`, `TemplateRenderer`) that
//! the scheduler depends on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RenewlyConfig;
pub use error::{RenewlyError, Result};
pub use traits::{ChannelSender, Store, TemplateRenderer};
