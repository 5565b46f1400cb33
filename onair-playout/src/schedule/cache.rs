//! Playlist cache
//!
//! Memoizes each channel's sorted day plan per (channel, date). Entries are
//! immutable `Arc<[ScheduleItem]>` snapshots: a writer builds a new list and
//! swaps it in, so concurrent readers see either the old or the new list,
//! never a half-updated one.
//!
//! The cache is an optimization only. Resolution over a cached list and a
//! freshly fetched one is identical.

use chrono::NaiveDate;
use onair_common::{ScheduleItem, ScheduleStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

use super::resolver::sort_schedule;
use crate::error::Result;
use crate::store::PlayoutStore;

type CacheKey = (Uuid, NaiveDate);

/// Sorted day plan shared between readers
pub type Playlist = Arc<[ScheduleItem]>;

#[derive(Default)]
struct Entries {
    playlists: HashMap<CacheKey, Playlist>,
    /// Bumped by every invalidation of a channel; a fetch that started
    /// under an older generation must not be stored
    generations: HashMap<Uuid, u64>,
}

impl Entries {
    fn generation(&self, channel_id: Uuid) -> u64 {
        self.generations.get(&channel_id).copied().unwrap_or(0)
    }

    fn bump(&mut self, channel_id: Uuid) {
        *self.generations.entry(channel_id).or_insert(0) += 1;
    }
}

pub struct PlaylistCache {
    store: Arc<dyn PlayoutStore>,
    entries: RwLock<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlaylistCache {
    pub fn new(store: Arc<dyn PlayoutStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Sorted day plan for (channel, date), fetched on first access
    pub async fn get(&self, channel_id: Uuid, date: NaiveDate) -> Result<Playlist> {
        if let Some(playlist) = self.lookup(channel_id, date) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(playlist);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.read().generation(channel_id);
        // Fetch outside the lock; a concurrent miss for the same key fetches
        // too and the first insert wins.
        let mut items = self.store.fetch_schedule(channel_id, date).await?;
        sort_schedule(&mut items);
        debug!(
            "Fetched playlist for channel {} on {}: {} items",
            channel_id,
            date,
            items.len()
        );

        let fetched: Playlist = items.into();
        let mut entries = self.write();
        if entries.generation(channel_id) != generation {
            debug!(
                "Playlist for channel {} on {} invalidated during fetch; not caching",
                channel_id, date
            );
            return Ok(fetched);
        }
        let playlist = entries
            .playlists
            .entry((channel_id, date))
            .or_insert(fetched)
            .clone();
        Ok(playlist)
    }

    /// Drop one (channel, date) entry; returns whether it was cached
    pub fn invalidate(&self, channel_id: Uuid, date: NaiveDate) -> bool {
        let mut entries = self.write();
        entries.bump(channel_id);
        let removed = entries.playlists.remove(&(channel_id, date)).is_some();
        if removed {
            debug!("Invalidated playlist for channel {} on {}", channel_id, date);
        }
        removed
    }

    /// Drop every date cached for a channel
    pub fn invalidate_channel(&self, channel_id: Uuid) -> usize {
        let mut entries = self.write();
        entries.bump(channel_id);
        let before = entries.playlists.len();
        entries
            .playlists
            .retain(|(cached_channel, _), _| *cached_channel != channel_id);
        before - entries.playlists.len()
    }

    /// Reflect an engine-owned status change in the cached copy
    pub fn mark_status(&self, channel_id: Uuid, date: NaiveDate, item_id: Uuid, status: ScheduleStatus) {
        let mut entries = self.write();
        let Some(playlist) = entries.playlists.get_mut(&(channel_id, date)) else {
            return;
        };
        if !playlist.iter().any(|item| item.id == item_id && item.status != status) {
            return;
        }

        let updated: Vec<ScheduleItem> = playlist
            .iter()
            .map(|item| {
                let mut item = item.clone();
                if item.id == item_id {
                    item.status = status;
                }
                item
            })
            .collect();
        *playlist = updated.into();
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn lookup(&self, channel_id: Uuid, date: NaiveDate) -> Option<Playlist> {
        self.read().playlists.get(&(channel_id, date)).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::resolver::resolve;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use onair_common::{Channel, ChannelStatus, PlaybackLogEntry};
    use tokio::sync::Notify;

    /// Holds every schedule fetch after reading until released
    struct GatedStore {
        inner: Arc<MemoryStore>,
        fetched: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PlayoutStore for GatedStore {
        async fn fetch_channel(&self, channel_id: Uuid) -> Result<Channel> {
            self.inner.fetch_channel(channel_id).await
        }

        async fn fetch_channels(&self) -> Result<Vec<Channel>> {
            self.inner.fetch_channels().await
        }

        async fn fetch_schedule(&self, channel_id: Uuid, date: NaiveDate) -> Result<Vec<ScheduleItem>> {
            let items = self.inner.fetch_schedule(channel_id, date).await?;
            self.fetched.notify_one();
            self.release.notified().await;
            Ok(items)
        }

        async fn update_schedule_item_status(&self, item_id: Uuid, status: ScheduleStatus) -> Result<()> {
            self.inner.update_schedule_item_status(item_id, status).await
        }

        async fn update_channel_status(&self, channel_id: Uuid, status: ChannelStatus) -> Result<()> {
            self.inner.update_channel_status(channel_id, status).await
        }

        async fn append_playback_log(&self, entry: &PlaybackLogEntry) -> Result<()> {
            self.inner.append_playback_log(entry).await
        }

        async fn fetch_playback_log(&self, channel_id: Uuid, limit: usize) -> Result<Vec<PlaybackLogEntry>> {
            self.inner.fetch_playback_log(channel_id, limit).await
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn seeded_store(channel_id: Uuid) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (hour, order) in [(12, 0), (9, 1), (9, 0)] {
            store.insert_schedule_item(ScheduleItem {
                id: Uuid::new_v4(),
                channel_id,
                media: None,
                scheduled_date: date(),
                scheduled_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                duration_seconds: 600,
                order_position: order,
                status: ScheduleStatus::Scheduled,
            });
        }
        store
    }

    #[tokio::test]
    async fn test_second_get_is_memoized_and_sorted() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let cache = PlaylistCache::new(store.clone());

        let first = cache.get(channel_id, date()).await.unwrap();
        let second = cache.get(channel_id, date()).await.unwrap();

        assert_eq!(store.schedule_fetches(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), (1, 1));

        let keys: Vec<(u32, i64)> = first
            .iter()
            .map(|i| (i.start_seconds(), i.order_position))
            .collect();
        assert_eq!(keys, vec![(32_400, 0), (32_400, 1), (43_200, 0)]);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let cache = PlaylistCache::new(store.clone());

        cache.get(channel_id, date()).await.unwrap();
        assert!(cache.invalidate(channel_id, date()));
        assert!(!cache.invalidate(channel_id, date()));
        cache.get(channel_id, date()).await.unwrap();

        assert_eq!(store.schedule_fetches(), 2);
    }

    #[tokio::test]
    async fn test_dates_are_separate_keys() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let cache = PlaylistCache::new(store.clone());

        cache.get(channel_id, date()).await.unwrap();
        let next_day = cache.get(channel_id, date().succ_opt().unwrap()).await.unwrap();

        assert!(next_day.is_empty());
        assert_eq!(store.schedule_fetches(), 2);
        assert_eq!(cache.invalidate_channel(channel_id), 2);
    }

    #[tokio::test]
    async fn test_cached_and_fresh_resolution_match() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let cache = PlaylistCache::new(store.clone());

        let cached = cache.get(channel_id, date()).await.unwrap();
        let fresh = store.fetch_schedule(channel_id, date()).await.unwrap();

        for now in [0, 32_400, 32_700, 40_000, 43_500, 86_000] {
            assert_eq!(resolve(&cached, now), resolve(&fresh, now));
        }
    }

    #[tokio::test]
    async fn test_mark_status_swaps_snapshot() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let cache = PlaylistCache::new(store.clone());

        let before = cache.get(channel_id, date()).await.unwrap();
        let target = before[0].id;
        cache.mark_status(channel_id, date(), target, ScheduleStatus::Completed);
        let after = cache.get(channel_id, date()).await.unwrap();

        // Old snapshot untouched, new snapshot updated
        assert_eq!(before[0].status, ScheduleStatus::Scheduled);
        assert_eq!(after[0].status, ScheduleStatus::Completed);
        assert_eq!(store.schedule_fetches(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_lists() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let cache = Arc::new(PlaylistCache::new(store.clone()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    cache.invalidate(channel_id, date());
                }
                cache.get(channel_id, date()).await.unwrap().len()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_is_not_undone() {
        let channel_id = Uuid::new_v4();
        let store = seeded_store(channel_id);
        let gated = Arc::new(GatedStore {
            inner: store.clone(),
            fetched: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(PlaylistCache::new(gated.clone()));

        let in_flight = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(channel_id, date()).await.unwrap().len() })
        };
        gated.fetched.notified().await;

        // Edit lands and is announced while the old plan is still in flight
        let removed = store.fetch_schedule(channel_id, date()).await.unwrap()[0].id;
        store.remove_schedule_item(removed);
        cache.invalidate(channel_id, date());
        gated.release.notify_one();

        // The caller still gets its own answer, but it is not kept
        assert_eq!(in_flight.await.unwrap(), 3);
        assert!(cache.lookup(channel_id, date()).is_none());

        gated.release.notify_one();
        let refetched = cache.get(channel_id, date()).await.unwrap();
        assert_eq!(refetched.len(), 2);
        assert!(refetched.iter().all(|item| item.id != removed));
        assert!(cache.lookup(channel_id, date()).is_some());
    }
}
