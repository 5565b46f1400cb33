//! Playback: per-channel sessions and the engine that drives them

pub mod engine;
pub mod logger;
pub mod player;
pub mod session;
pub mod status;
pub mod ticker;

pub use engine::{ChannelOverview, CurrentProgram, PlayoutCommand, PlayoutEngine};
pub use logger::PlaybackLogger;
pub use player::{HeadlessPlayer, HeadlessPlayerFactory, PlayerError, PlayerFactory, PlayerHandle};
pub use session::{PlaybackSession, SessionEffect, SessionSnapshot};
pub use status::ChannelStatusManager;
