//! # OnAir Common Library
//!
//! Shared code for the OnAir broadcast services including:
//! - Channel, media and schedule records (the engine's inbound data)
//! - Event types broadcast to clients (`PlayoutEvent`)
//! - Bootstrap configuration loading
//! - Wall-clock helpers and the `Clock` seam
//! - SQLite schema initialisation

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{
    Channel, ChannelKind, ChannelStatus, MediaAsset, MediaKind, PlaybackActor, PlaybackLogEntry,
    PlaybackOutcome, ScheduleItem, ScheduleStatus,
};
