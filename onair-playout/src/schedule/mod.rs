//! Day-plan resolution and caching

pub mod cache;
pub mod resolver;

pub use cache::{Playlist, PlaylistCache};
pub use resolver::{resolve, schedule_order, sort_schedule, Resolution};
