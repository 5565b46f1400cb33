//! Command operations module
//!
//! **Responsibilities:**
//! - Session commands (play, pause, stop, skip, select item, mute, unmute)
//! - Player-handle notifications (backend failure, end of media)
//! - Channel status overrides and playlist invalidation

use chrono::{NaiveDate, Utc};
use onair_common::events::PlayoutEvent;
use onair_common::ChannelStatus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::core::PlayoutEngine;
use crate::error::Result;
use crate::playback::session::SessionSnapshot;

/// Commands accepted by a channel's playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayoutCommand {
    Play,
    Pause,
    Stop,
    Skip,
    SelectItem { item_id: Uuid },
    /// Mute the current item
    Mute,
    /// Explicit user gesture; later items load unmuted
    Unmute,
}

impl PlayoutEngine {
    /// Apply a command to the channel's session and return the new state
    ///
    /// Commands for an unopened channel open it first.
    pub async fn command(&self, channel_id: Uuid, command: PlayoutCommand) -> Result<SessionSnapshot> {
        info!("[{}] Command received: {:?}", channel_id, command);

        self.with_session(channel_id, |session| {
            match command {
                PlayoutCommand::Play => session.play(),
                PlayoutCommand::Pause => session.pause(),
                PlayoutCommand::Stop => session.stop(),
                PlayoutCommand::Skip => session.skip(),
                PlayoutCommand::SelectItem { item_id } => session.select(item_id)?,
                PlayoutCommand::Mute => session.mute(),
                PlayoutCommand::Unmute => session.unmute(),
            }
            Ok(session.snapshot())
        })
        .await
    }

    pub async fn play(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        self.command(channel_id, PlayoutCommand::Play).await
    }

    pub async fn pause(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        self.command(channel_id, PlayoutCommand::Pause).await
    }

    pub async fn stop(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        self.command(channel_id, PlayoutCommand::Stop).await
    }

    pub async fn skip(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        self.command(channel_id, PlayoutCommand::Skip).await
    }

    pub async fn select_item(&self, channel_id: Uuid, item_id: Uuid) -> Result<SessionSnapshot> {
        self.command(channel_id, PlayoutCommand::SelectItem { item_id }).await
    }

    /// The player backend failed asynchronously (stream dropped, decoder
    /// error). The item is logged as an error and the session holds Paused.
    pub async fn report_player_failure(
        &self,
        channel_id: Uuid,
        message: impl Into<String>,
    ) -> Result<SessionSnapshot> {
        let message = message.into();
        self.with_session(channel_id, move |session| {
            session.report_failure(message);
            Ok(session.snapshot())
        })
        .await
    }

    /// The player reached the end of the media
    ///
    /// Informational only: the nominal duration decides when an item ends,
    /// so media running short or long never moves the session.
    pub async fn report_media_ended(&self, channel_id: Uuid, item_id: Uuid) -> Result<()> {
        self.with_session(channel_id, |session| {
            match session.current_item() {
                Some(current) if current.id == item_id => {
                    let drift = i64::from(current.duration_seconds)
                        - i64::from(session.elapsed_seconds());
                    if drift != 0 {
                        debug!(
                            "[{}] Media for item {} ended {}s off its nominal end",
                            channel_id, item_id, drift
                        );
                    }
                }
                _ => debug!("[{}] End of media for item {} not on air", channel_id, item_id),
            }
            Ok(())
        })
        .await
    }

    /// Manual status override (e.g. standby during maintenance)
    ///
    /// Returns true if the status changed. Later session transitions set
    /// the status again as usual.
    pub async fn set_channel_status(&self, channel_id: Uuid, status: ChannelStatus) -> Result<bool> {
        let channel = self.store.fetch_channel(channel_id).await?;
        self.status.seed(channel_id, channel.status);

        let changed = self.status.set_status(channel_id, status);
        if changed {
            info!("[{}] Channel status set to {}", channel_id, status);
        }
        Ok(changed)
    }

    /// Drop the cached plan for (channel, date), today if `date` is None
    ///
    /// An open session planning from that day gets the fresh plan as its
    /// lineup; the loaded item is not interrupted. Returns whether an
    /// entry was cached.
    pub async fn invalidate_playlist(&self, channel_id: Uuid, date: Option<NaiveDate>) -> Result<bool> {
        self.store.fetch_channel(channel_id).await?;
        let date = date.unwrap_or_else(|| self.clock.now_local().date());
        let removed = self.cache.invalidate(channel_id, date);

        self.state.broadcast_event(PlayoutEvent::PlaylistInvalidated {
            channel_id,
            date,
            timestamp: Utc::now(),
        });

        let runtime = self.channels.read().await.get(&channel_id).cloned();
        if let Some(runtime) = runtime {
            let mut cell = runtime.lock().await;
            if cell.date == date {
                match self.cache.get(channel_id, date).await {
                    Ok(playlist) => cell.session.set_lineup(playlist.to_vec()),
                    Err(e) => warn!("[{}] Failed to refetch day plan: {}", channel_id, e),
                }
            }
        }

        Ok(removed)
    }
}
