//! Player handle abstraction
//!
//! The session drives video and audio items through the same capability
//! set, so the state machine is written once regardless of media kind.
//! End-of-media and asynchronous failures travel the other way, through
//! [`crate::PlayoutEngine::report_media_ended`] and
//! [`crate::PlayoutEngine::report_player_failure`].

use onair_common::Channel;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Backend refused or failed an operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlayerError(pub String);

/// Control surface of one playback backend instance
pub trait PlayerHandle: Send {
    /// Prepare `locator` for playback starting `start_offset_seconds` in
    fn load(&mut self, locator: &str, start_offset_seconds: u32) -> Result<(), PlayerError>;

    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self);

    fn mute(&mut self);

    fn unmute(&mut self);
}

/// Creates one player handle per channel session
pub trait PlayerFactory: Send + Sync {
    fn create(&self, channel: &Channel) -> Box<dyn PlayerHandle>;
}

/// Player for headless playout: accepts every operation and only traces it.
/// Used when the engine's session is the on-air authority and rendering
/// happens in the viewers' own players.
#[derive(Debug)]
pub struct HeadlessPlayer {
    channel_id: Uuid,
    locator: Option<String>,
}

impl HeadlessPlayer {
    pub fn new(channel_id: Uuid) -> Self {
        Self {
            channel_id,
            locator: None,
        }
    }
}

impl PlayerHandle for HeadlessPlayer {
    fn load(&mut self, locator: &str, start_offset_seconds: u32) -> Result<(), PlayerError> {
        debug!(
            "[{}] load {} at +{}s",
            self.channel_id, locator, start_offset_seconds
        );
        self.locator = Some(locator.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        match &self.locator {
            Some(_) => Ok(()),
            None => Err(PlayerError("nothing loaded".to_string())),
        }
    }

    fn pause(&mut self) {
        debug!("[{}] pause", self.channel_id);
    }

    fn mute(&mut self) {
        debug!("[{}] mute", self.channel_id);
    }

    fn unmute(&mut self) {
        debug!("[{}] unmute", self.channel_id);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessPlayerFactory;

impl PlayerFactory for HeadlessPlayerFactory {
    fn create(&self, channel: &Channel) -> Box<dyn PlayerHandle> {
        Box::new(HeadlessPlayer::new(channel.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_player_requires_load_before_play() {
        let mut player = HeadlessPlayer::new(Uuid::nil());
        assert!(player.play().is_err());

        player.load("https://cdn.example/a.mp4", 0).unwrap();
        assert!(player.play().is_ok());
    }
}
