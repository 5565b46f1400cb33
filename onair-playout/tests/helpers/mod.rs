//! Shared fixtures for onair-playout integration tests
//!
//! - Channel/media/schedule builders
//! - RecordingPlayerFactory: player doubles with failure injection
//! - TestEngine: engine over a MemoryStore and a ManualClock

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use onair_common::time::ManualClock;
use onair_common::{
    Channel, ChannelKind, ChannelStatus, MediaAsset, MediaKind, ScheduleItem, ScheduleStatus,
};
use onair_playout::config::RuntimeSettings;
use onair_playout::playback::{PlayerError, PlayerFactory, PlayerHandle};
use onair_playout::store::MemoryStore;
use onair_playout::{PlayoutEngine, SharedState};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    test_date().and_hms_opt(h, m, s).unwrap()
}

pub fn channel(name: &str, auto_advance: bool) -> Channel {
    Channel {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind: ChannelKind::Tv,
        status: ChannelStatus::OffAir,
        auto_advance,
    }
}

pub fn media(title: &str, duration_seconds: u32) -> MediaAsset {
    MediaAsset {
        id: Uuid::new_v4(),
        title: title.to_string(),
        kind: MediaKind::Video,
        locator: format!("https://cdn.example/{}.mp4", title.to_lowercase().replace(' ', "-")),
        thumbnail: None,
        duration_seconds,
    }
}

/// Schedule item for `test_date()` at `start`, with media of the same length
pub fn item(channel_id: Uuid, title: &str, start: (u32, u32, u32), duration_seconds: u32) -> ScheduleItem {
    ScheduleItem {
        id: Uuid::new_v4(),
        channel_id,
        media: Some(media(title, duration_seconds)),
        scheduled_date: test_date(),
        scheduled_time: NaiveTime::from_hms_opt(start.0, start.1, start.2).unwrap(),
        duration_seconds,
        order_position: 0,
        status: ScheduleStatus::Scheduled,
    }
}

/// Operations seen by every player the factory created, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerOp {
    Load(String, u32),
    Play,
    Pause,
    Mute,
    Unmute,
}

#[derive(Default)]
struct FactoryState {
    ops: Vec<PlayerOp>,
    failing_locators: HashSet<String>,
    fail_play: bool,
}

/// Creates players that record every call and fail on demand
#[derive(Clone, Default)]
pub struct RecordingPlayerFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl RecordingPlayerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<PlayerOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Loading `locator` fails until cleared
    pub fn fail_locator(&self, locator: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_locators
            .insert(locator.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_locators.clear();
        state.fail_play = false;
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.state.lock().unwrap().fail_play = fail;
    }
}

struct RecordingPlayer {
    state: Arc<Mutex<FactoryState>>,
}

impl PlayerHandle for RecordingPlayer {
    fn load(&mut self, locator: &str, start_offset_seconds: u32) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(PlayerOp::Load(locator.to_string(), start_offset_seconds));
        if state.failing_locators.contains(locator) {
            return Err(PlayerError(format!("cannot open {}", locator)));
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(PlayerOp::Play);
        if state.fail_play {
            return Err(PlayerError("decoder stalled".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().ops.push(PlayerOp::Pause);
    }

    fn mute(&mut self) {
        self.state.lock().unwrap().ops.push(PlayerOp::Mute);
    }

    fn unmute(&mut self) {
        self.state.lock().unwrap().ops.push(PlayerOp::Unmute);
    }
}

impl PlayerFactory for RecordingPlayerFactory {
    fn create(&self, _channel: &Channel) -> Box<dyn PlayerHandle> {
        Box::new(RecordingPlayer {
            state: Arc::clone(&self.state),
        })
    }
}

/// Engine wired to in-memory collaborators
pub struct TestEngine {
    pub engine: Arc<PlayoutEngine>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub players: RecordingPlayerFactory,
}

impl TestEngine {
    /// One-second ticks, no start-up seeding
    pub fn new(now: NaiveDateTime) -> Self {
        Self::with_settings(
            now,
            RuntimeSettings {
                auto_seed_on_start: false,
                ..RuntimeSettings::default()
            },
        )
    }

    pub fn with_settings(now: NaiveDateTime, settings: RuntimeSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now));
        let players = RecordingPlayerFactory::new();
        let engine = Arc::new(PlayoutEngine::new(
            store.clone(),
            settings,
            clock.clone(),
            Arc::new(players.clone()),
            Arc::new(SharedState::new()),
        ));

        Self {
            engine,
            store,
            clock,
            players,
        }
    }

    /// Register a channel and its day plan
    pub fn add_channel(&self, channel: &Channel, items: &[ScheduleItem]) {
        self.store.insert_channel(channel.clone());
        for item in items {
            self.store.insert_schedule_item(item.clone());
        }
    }
}
