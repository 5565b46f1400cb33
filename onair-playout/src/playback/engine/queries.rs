//! Query operations module
//!
//! **Responsibilities:**
//! - Pull-based schedule queries (current program, upcoming)
//! - Session snapshots
//! - Channel status and channel listing
//!
//! Schedule queries never touch the live session: callers pick their own
//! polling cadence and every answer is a pure resolution of the cached
//! day plan at the requested instant.

use chrono::NaiveDateTime;
use onair_common::events::SessionStatus;
use onair_common::time::seconds_since_midnight;
use onair_common::{Channel, ChannelStatus, PlaybackLogEntry, ScheduleItem};
use serde::Serialize;
use uuid::Uuid;

use super::core::PlayoutEngine;
use crate::error::Result;
use crate::playback::session::SessionSnapshot;
use crate::schedule::{resolve, Resolution};

/// What a channel airs at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentProgram {
    pub channel_id: Uuid,
    pub at: NaiveDateTime,
    pub item: Option<ScheduleItem>,
    /// Seconds of the item already aired at `at`
    pub offset_seconds: u32,
    pub remaining_seconds: Option<u32>,
    /// Item was promoted from upcoming to fill a gap
    pub promoted: bool,
}

/// Channel descriptor with live status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOverview {
    #[serde(flatten)]
    pub channel: Channel,
    /// None until the channel's session is opened
    pub session_status: Option<SessionStatus>,
}

impl PlayoutEngine {
    /// Item airing on the channel at `at` (the clock's now when None)
    pub async fn get_current_program(
        &self,
        channel_id: Uuid,
        at: Option<NaiveDateTime>,
    ) -> Result<CurrentProgram> {
        let at = at.unwrap_or_else(|| self.clock.now_local());
        let now_seconds = seconds_since_midnight(at.time());
        let resolution = self.resolve_at(channel_id, at).await?;

        Ok(CurrentProgram {
            channel_id,
            at,
            offset_seconds: resolution.offset_into_current(now_seconds),
            remaining_seconds: resolution.remaining_in_current(now_seconds),
            promoted: resolution.promoted,
            item: resolution.current,
        })
    }

    /// Items starting after `at`, at most `limit` (the
    /// `upcoming_default_limit` setting when None)
    pub async fn get_upcoming(
        &self,
        channel_id: Uuid,
        at: Option<NaiveDateTime>,
        limit: Option<usize>,
    ) -> Result<Vec<ScheduleItem>> {
        let at = at.unwrap_or_else(|| self.clock.now_local());
        let limit = limit.unwrap_or(self.settings.upcoming_default_limit);

        let mut upcoming = self.resolve_at(channel_id, at).await?.upcoming;
        upcoming.truncate(limit);
        Ok(upcoming)
    }

    /// Snapshot of the channel's session, opening the channel if needed
    pub async fn get_session_state(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        let runtime = self.ensure_runtime(channel_id).await?;
        let cell = runtime.lock().await;
        Ok(cell.session.snapshot())
    }

    pub async fn get_channel_status(&self, channel_id: Uuid) -> Result<ChannelStatus> {
        if let Some(status) = self.status.get_status(channel_id) {
            return Ok(status);
        }
        Ok(self.store.fetch_channel(channel_id).await?.status)
    }

    /// Every known channel with its live status
    pub async fn list_channels(&self) -> Result<Vec<ChannelOverview>> {
        let channels = self.store.fetch_channels().await?;
        let runtimes = self.channels.read().await.clone();

        let mut overviews = Vec::with_capacity(channels.len());
        for mut channel in channels {
            if let Some(status) = self.status.get_status(channel.id) {
                channel.status = status;
            }
            let session_status = match runtimes.get(&channel.id) {
                Some(runtime) => Some(runtime.lock().await.session.status()),
                None => None,
            };
            overviews.push(ChannelOverview {
                channel,
                session_status,
            });
        }
        Ok(overviews)
    }

    /// Recent playback log for a channel, newest first
    ///
    /// Reads what the store holds; entries still queued in the logger are
    /// not included.
    pub async fn get_playback_history(
        &self,
        channel_id: Uuid,
        limit: usize,
    ) -> Result<Vec<PlaybackLogEntry>> {
        self.store.fetch_channel(channel_id).await?;
        self.store.fetch_playback_log(channel_id, limit).await
    }

    async fn resolve_at(&self, channel_id: Uuid, at: NaiveDateTime) -> Result<Resolution> {
        if !self.channels.read().await.contains_key(&channel_id) {
            // Unknown channels are an error, not an empty schedule
            self.store.fetch_channel(channel_id).await?;
        }
        let playlist = self.cache.get(channel_id, at.date()).await?;
        Ok(resolve(&playlist, seconds_since_midnight(at.time())))
    }
}
