//! # OnAir Playout Engine (onair-playout)
//!
//! Decides, at any wall-clock instant, which scheduled item a broadcast
//! channel is airing; drives play/pause/stop/skip transitions; advances
//! automatically at item boundaries; and records an append-only playback
//! history.
//!
//! **Architecture:** pure schedule resolution, a per-channel session state
//! machine driven by commands and a cancellable 1 Hz ticker, and
//! fire-and-forget persistence through the [`store::PlayoutStore`] seam.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;
pub mod schedule;
pub mod state;
pub mod store;
pub mod viewers;

pub use error::{Error, Result};
pub use playback::{PlayoutCommand, PlayoutEngine, SessionSnapshot};
pub use state::SharedState;
