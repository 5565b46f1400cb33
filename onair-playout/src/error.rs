//! Error types for onair-playout
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for onair-playout
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors bubbled up from the common crate
    #[error(transparent)]
    Common(#[from] onair_common::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Outbound store failures
    #[error("Store error: {0}")]
    Store(String),

    /// Unknown channel
    #[error("Channel not found: {0}")]
    ChannelNotFound(Uuid),

    /// Schedule item not in the channel's day plan
    #[error("Schedule item not found: {0}")]
    ItemNotFound(Uuid),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using onair-playout Error
pub type Result<T> = std::result::Result<T, Error>;
