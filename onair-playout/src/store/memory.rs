//! In-process store
//!
//! Keeps everything in memory and records every outbound call, which makes
//! it the store of choice for embedding and for auditing the engine's
//! writes in tests. `set_failing(true)` makes every outbound write fail.

use async_trait::async_trait;
use chrono::NaiveDate;
use onair_common::{Channel, ChannelStatus, PlaybackLogEntry, ScheduleItem, ScheduleStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

use super::PlayoutStore;
use crate::error::{Error, Result};

#[derive(Default)]
struct Inner {
    channels: HashMap<Uuid, Channel>,
    schedule: Vec<ScheduleItem>,
    playback_log: Vec<PlaybackLogEntry>,
    channel_status_updates: Vec<(Uuid, ChannelStatus)>,
    item_status_updates: Vec<(Uuid, ScheduleStatus)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    schedule_fetches: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.write().channels.insert(channel.id, channel);
    }

    pub fn insert_schedule_item(&self, item: ScheduleItem) {
        let mut inner = self.write();
        inner.schedule.retain(|existing| existing.id != item.id);
        inner.schedule.push(item);
    }

    /// Remove a scheduled item, as an admin edit would
    pub fn remove_schedule_item(&self, item_id: Uuid) {
        self.write().schedule.retain(|item| item.id != item_id);
    }

    /// Make every outbound write fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Log entries appended so far, in append order
    pub fn playback_log(&self) -> Vec<PlaybackLogEntry> {
        self.read().playback_log.clone()
    }

    /// Every `update_channel_status` call received, in order
    pub fn channel_status_updates(&self) -> Vec<(Uuid, ChannelStatus)> {
        self.read().channel_status_updates.clone()
    }

    /// Every `update_schedule_item_status` call received, in order
    pub fn item_status_updates(&self) -> Vec<(Uuid, ScheduleStatus)> {
        self.read().item_status_updates.clone()
    }

    /// Number of `fetch_schedule` calls served
    pub fn schedule_fetches(&self) -> usize {
        self.schedule_fetches.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Store("store unavailable".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PlayoutStore for MemoryStore {
    async fn fetch_channel(&self, channel_id: Uuid) -> Result<Channel> {
        self.read()
            .channels
            .get(&channel_id)
            .cloned()
            .ok_or(Error::ChannelNotFound(channel_id))
    }

    async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        let mut channels: Vec<Channel> = self.read().channels.values().cloned().collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    async fn fetch_schedule(&self, channel_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleItem>> {
        self.schedule_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .read()
            .schedule
            .iter()
            .filter(|item| item.channel_id == channel_id && item.scheduled_date == date)
            .cloned()
            .collect())
    }

    async fn update_schedule_item_status(&self, item_id: Uuid, status: ScheduleStatus) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.write();
        inner.item_status_updates.push((item_id, status));
        if let Some(item) = inner.schedule.iter_mut().find(|item| item.id == item_id) {
            item.status = status;
        }
        Ok(())
    }

    async fn update_channel_status(&self, channel_id: Uuid, status: ChannelStatus) -> Result<()> {
        self.check_writable()?;
        let mut inner = self.write();
        inner.channel_status_updates.push((channel_id, status));
        if let Some(channel) = inner.channels.get_mut(&channel_id) {
            channel.status = status;
        }
        Ok(())
    }

    async fn append_playback_log(&self, entry: &PlaybackLogEntry) -> Result<()> {
        self.check_writable()?;
        self.write().playback_log.push(entry.clone());
        Ok(())
    }

    async fn fetch_playback_log(&self, channel_id: Uuid, limit: usize) -> Result<Vec<PlaybackLogEntry>> {
        Ok(self
            .read()
            .playback_log
            .iter()
            .rev()
            .filter(|entry| entry.channel_id == channel_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
