//! SQLite-backed `PlayoutStore`

use async_trait::async_trait;
use chrono::NaiveDate;
use onair_common::{Channel, ChannelStatus, PlaybackLogEntry, ScheduleItem, ScheduleStatus};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{channels, playback_log, schedule};
use crate::error::Result;
use crate::store::PlayoutStore;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PlayoutStore for SqliteStore {
    async fn fetch_channel(&self, channel_id: Uuid) -> Result<Channel> {
        channels::get_channel(&self.pool, channel_id).await
    }

    async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        channels::list_channels(&self.pool).await
    }

    async fn fetch_schedule(&self, channel_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleItem>> {
        schedule::get_day_schedule(&self.pool, channel_id, date).await
    }

    async fn update_schedule_item_status(&self, item_id: Uuid, status: ScheduleStatus) -> Result<()> {
        schedule::update_item_status(&self.pool, item_id, status).await
    }

    async fn update_channel_status(&self, channel_id: Uuid, status: ChannelStatus) -> Result<()> {
        channels::update_channel_status(&self.pool, channel_id, status).await
    }

    async fn append_playback_log(&self, entry: &PlaybackLogEntry) -> Result<()> {
        playback_log::append_entry(&self.pool, entry).await
    }

    async fn fetch_playback_log(&self, channel_id: Uuid, limit: usize) -> Result<Vec<PlaybackLogEntry>> {
        playback_log::recent_entries(&self.pool, channel_id, limit).await
    }
}
