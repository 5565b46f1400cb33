//! Database access layer
//!
//! SQLite queries for channels, day plans, the playback log and runtime
//! settings, plus [`SqliteStore`], the `PlayoutStore` backed by them.

pub mod channels;
pub mod playback_log;
pub mod schedule;
pub mod settings;
mod store;

pub use store::SqliteStore;

use crate::error::{Error, Result};
use uuid::Uuid;

/// Parse a TEXT guid column
pub(crate) fn parse_guid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Store(format!("Invalid {} '{}': {}", column, value, e)))
}

/// Clamp an INTEGER seconds column into `u32`
pub(crate) fn seconds_from_db(column: &str, value: i64) -> u32 {
    match u32::try_from(value) {
        Ok(seconds) => seconds,
        Err(_) if value < 0 => {
            tracing::warn!("Negative {} ({}) treated as 0", column, value);
            0
        }
        Err(_) => u32::MAX,
    }
}
