//! Error types shared by the streak and role progression core.

use crate::config::ConfigError;
use crate::membership::MembershipError;

/// Errors surfaced to callers of the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Membership error: {0}")]
    Membership(#[from] MembershipError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
