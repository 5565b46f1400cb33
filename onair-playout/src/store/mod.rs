//! Boundary between the playout engine and whatever persists its data
//!
//! Inbound reads (channel descriptors, day plans) and the three outbound
//! writes the engine issues. The engine never depends on a write having
//! succeeded; its in-memory state is authoritative.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use onair_common::{Channel, ChannelStatus, PlaybackLogEntry, ScheduleItem, ScheduleStatus};
use uuid::Uuid;

use crate::error::Result;

#[async_trait]
pub trait PlayoutStore: Send + Sync {
    /// Channel descriptor; `Error::ChannelNotFound` if unknown
    async fn fetch_channel(&self, channel_id: Uuid) -> Result<Channel>;

    /// Every known channel
    async fn fetch_channels(&self) -> Result<Vec<Channel>>;

    /// A channel's day plan, items joined with their media asset where the
    /// reference resolves. Order is unspecified.
    async fn fetch_schedule(&self, channel_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleItem>>;

    async fn update_schedule_item_status(&self, item_id: Uuid, status: ScheduleStatus) -> Result<()>;

    async fn update_channel_status(&self, channel_id: Uuid, status: ChannelStatus) -> Result<()>;

    async fn append_playback_log(&self, entry: &PlaybackLogEntry) -> Result<()>;

    /// Most recent log entries for a channel, newest first
    async fn fetch_playback_log(&self, channel_id: Uuid, limit: usize) -> Result<Vec<PlaybackLogEntry>>;
}
