//! Error type shared by every Renewly crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenewlyError {
    /// Malformed input rejected before anything is persisted.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    /// Outbound send failed or the channel is misconfigured.
    #[error("channel error: {0}")]
    Channel(String),

    #[error("template error: {0}")]
    Template(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl RenewlyError {
    /// True for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, RenewlyError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, RenewlyError>;
