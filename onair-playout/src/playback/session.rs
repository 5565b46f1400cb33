//! Playback session state machine
//!
//! One session per channel owns the loaded item, its elapsed time and the
//! Idle/Loading/Playing/Paused/Stopped status. It is synchronous and does no
//! I/O: every transition that must be persisted or announced is queued as a
//! [`SessionEffect`] which the engine drains with [`PlaybackSession::take_effects`].
//!
//! ```text
//!            load            play              pause
//!   Idle ──────────▶ Loading ─────▶ Playing ◀───────▶ Paused
//!    ▲                                 │  tick at end:
//!    │  skip with no next              │   auto_advance → load next + play
//!    └─────────────────────────────────┤   hold         → Paused at end
//!                          stop (any) ─┴─▶ Stopped
//! ```
//!
//! Every schedule item instance is logged exactly once: on completion at
//! the tick, when skipped or selected away from, or on a backend error.

use chrono::{DateTime, NaiveDate, Utc};
use onair_common::events::SessionStatus;
use onair_common::time::Clock;
use onair_common::{
    Channel, ChannelStatus, PlaybackActor, PlaybackLogEntry, PlaybackOutcome, ScheduleItem,
    ScheduleStatus,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::player::PlayerHandle;
use crate::error::{Error, Result};
use crate::schedule::{schedule_order, sort_schedule};

const MISSING_MEDIA: &str = "missing or unusable media reference";

/// Immutable view of a session handed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub channel_id: Uuid,
    pub status: SessionStatus,
    pub elapsed_seconds: u32,
    pub current_item: Option<ScheduleItem>,
    pub next_item: Option<ScheduleItem>,
    pub muted: bool,
    pub user_has_unmuted: bool,
    pub last_error: Option<String>,
}

/// Side effect of a transition, applied by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// An item instance reached a terminal transition
    Logged {
        entry: PlaybackLogEntry,
        scheduled_date: NaiveDate,
    },
    /// Engine-owned schedule item status change
    ItemStatus {
        item_id: Uuid,
        scheduled_date: NaiveDate,
        status: ScheduleStatus,
    },
    /// An item instance entered Playing for the first time
    ItemStarted {
        item_id: Uuid,
        media_title: Option<String>,
    },
    /// Desired channel visibility; the status manager drops repeats
    ChannelStatus(ChannelStatus),
}

/// Status to carry over onto a newly cued item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continue {
    Play,
    Pause,
    Cue,
}

struct LoadedItem {
    item: ScheduleItem,
    /// Seconds already aired before this session joined the item
    join_offset: u32,
    loaded_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    logged: bool,
}

impl LoadedItem {
    fn duration(&self) -> u32 {
        self.item.duration_seconds
    }
}

pub struct PlaybackSession {
    channel_id: Uuid,
    auto_advance: bool,
    status: SessionStatus,
    current: Option<LoadedItem>,
    elapsed: u32,
    next: Option<ScheduleItem>,
    /// Day plan in schedule order
    lineup: Vec<ScheduleItem>,
    /// Items already logged in this day's pass; never auto-advanced into
    finished: HashSet<Uuid>,
    /// One-way latch set by an explicit user gesture
    user_has_unmuted: bool,
    muted: bool,
    last_error: Option<String>,
    /// Bumped by every external command; a ticker started under an older
    /// epoch must not touch the session
    epoch: u64,
    player: Box<dyn PlayerHandle>,
    clock: Arc<dyn Clock>,
    effects: Vec<SessionEffect>,
}

impl PlaybackSession {
    pub fn new(channel: &Channel, player: Box<dyn PlayerHandle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            channel_id: channel.id,
            auto_advance: channel.auto_advance,
            status: SessionStatus::Idle,
            current: None,
            elapsed: 0,
            next: None,
            lineup: Vec::new(),
            finished: HashSet::new(),
            user_has_unmuted: false,
            muted: true,
            last_error: None,
            epoch: 0,
            player,
            clock,
            effects: Vec::new(),
        }
    }

    pub fn channel_id(&self) -> Uuid {
        self.channel_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn set_auto_advance(&mut self, auto_advance: bool) {
        self.auto_advance = auto_advance;
    }

    pub fn current_item(&self) -> Option<&ScheduleItem> {
        self.current.as_ref().map(|c| &c.item)
    }

    pub fn next_item(&self) -> Option<&ScheduleItem> {
        self.next.as_ref()
    }

    pub fn lineup(&self) -> &[ScheduleItem] {
        &self.lineup
    }

    pub fn user_has_unmuted(&self) -> bool {
        self.user_has_unmuted
    }

    pub fn is_finished(&self, item_id: Uuid) -> bool {
        self.finished.contains(&item_id)
    }

    /// Replace the day plan the lookahead is computed from
    ///
    /// Items already marked completed in the plan count as finished for
    /// this pass. The loaded item is kept even if it is no longer listed.
    pub fn set_lineup(&mut self, mut items: Vec<ScheduleItem>) {
        sort_schedule(&mut items);
        self.finished.retain(|id| items.iter().any(|item| item.id == *id));
        for item in &items {
            if item.status == ScheduleStatus::Completed {
                self.finished.insert(item.id);
            }
        }
        self.lineup = items;
        self.refresh_next();
    }

    /// First unfinished item after `anchor` in schedule order
    pub fn next_candidate_after(&self, anchor: &ScheduleItem) -> Option<ScheduleItem> {
        self.lineup
            .iter()
            .find(|item| {
                item.id != anchor.id
                    && !self.finished.contains(&item.id)
                    && schedule_order(item, anchor) == Ordering::Greater
            })
            .cloned()
    }

    /// Load an item from the top
    pub fn load(&mut self, item: ScheduleItem) {
        self.load_at(item, 0);
    }

    /// Load an item starting `start_offset_seconds` in (joining a program
    /// already on air)
    pub fn load_at(&mut self, item: ScheduleItem, start_offset_seconds: u32) {
        self.bump_epoch();
        self.depart_current(PlaybackActor::Operator);
        self.cue(item, start_offset_seconds, Continue::Cue);
    }

    pub fn play(&mut self) {
        self.bump_epoch();
        let Some(current) = self.current.as_ref() else {
            debug!("[{}] Play ignored: no item loaded", self.channel_id);
            return;
        };
        if matches!(self.status, SessionStatus::Playing | SessionStatus::Idle) {
            return;
        }

        // Held at the end of an item (auto_advance off): play moves on
        if current.logged && self.elapsed >= current.duration() {
            match self.next.clone() {
                Some(next) => self.cue(next, 0, Continue::Play),
                None => debug!("[{}] Play ignored: held item has no successor", self.channel_id),
            }
            return;
        }

        if self.last_error.is_some() {
            let locator = current
                .item
                .media
                .as_ref()
                .map(|m| m.locator.clone())
                .unwrap_or_default();
            info!("[{}] Retrying load of {}", self.channel_id, locator);
            if let Err(e) = self.player.load(&locator, self.elapsed) {
                self.fail_current(e.0);
                return;
            }
            self.last_error = None;
            self.apply_mute_policy();
        }

        self.start_playing();
    }

    pub fn pause(&mut self) {
        self.bump_epoch();
        if self.status == SessionStatus::Playing {
            self.player.pause();
            self.status = SessionStatus::Paused;
        }
    }

    /// Instantaneous and idempotent; keeps the loaded item cued at zero
    pub fn stop(&mut self) {
        self.bump_epoch();
        if self.status == SessionStatus::Stopped {
            return;
        }
        self.player.pause();
        self.status = SessionStatus::Stopped;
        self.elapsed = 0;
        self.effects.push(SessionEffect::ChannelStatus(ChannelStatus::OffAir));
    }

    /// Advance one second; only meaningful while Playing
    pub fn tick(&mut self) {
        if self.status != SessionStatus::Playing {
            return;
        }
        let Some(duration) = self.current.as_ref().map(LoadedItem::duration) else {
            return;
        };

        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed >= duration {
            self.elapsed = duration;
            self.on_item_end(Continue::Play);
        }
    }

    /// Move to the lookahead item regardless of auto_advance, keeping the
    /// Playing/Paused status. With nothing after, the session goes Idle.
    pub fn skip(&mut self) {
        self.bump_epoch();
        let then = self.continuation();
        match self.next.clone() {
            Some(next) => {
                self.depart_current(PlaybackActor::Operator);
                self.cue(next, 0, then);
            }
            None => {
                self.depart_current(PlaybackActor::Operator);
                self.go_idle();
            }
        }
    }

    /// Jump to an arbitrary item of the day plan
    pub fn select(&mut self, item_id: Uuid) -> Result<()> {
        let item = self
            .lineup
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or(Error::ItemNotFound(item_id))?;

        self.bump_epoch();
        let then = self.continuation();
        self.depart_current(PlaybackActor::Operator);
        self.cue(item, 0, then);
        Ok(())
    }

    /// Explicit user gesture: audio allowed from now on
    pub fn unmute(&mut self) {
        self.user_has_unmuted = true;
        self.muted = false;
        self.player.unmute();
    }

    /// Mute the current item; the unmute latch stays set
    pub fn mute(&mut self) {
        self.muted = true;
        self.player.mute();
    }

    /// Backend reported a failure for the loaded item
    pub fn report_failure(&mut self, message: impl Into<String>) {
        self.bump_epoch();
        self.fail_current(message.into());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            channel_id: self.channel_id,
            status: self.status,
            elapsed_seconds: self.elapsed,
            current_item: self.current.as_ref().map(|c| c.item.clone()),
            next_item: self.next.clone(),
            muted: self.muted,
            user_has_unmuted: self.user_has_unmuted,
            last_error: self.last_error.clone(),
        }
    }

    /// Drain effects queued since the last call
    pub fn take_effects(&mut self) -> Vec<SessionEffect> {
        std::mem::take(&mut self.effects)
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn continuation(&self) -> Continue {
        match self.status {
            SessionStatus::Playing => Continue::Play,
            SessionStatus::Paused => Continue::Pause,
            _ => Continue::Cue,
        }
    }

    fn refresh_next(&mut self) {
        let next = self
            .current
            .as_ref()
            .and_then(|current| self.next_candidate_after(&current.item));
        self.next = next;
    }

    /// Log the loaded item as left behind, unless already logged
    fn depart_current(&mut self, actor: PlaybackActor) {
        let Some(current) = self.current.as_ref() else {
            return;
        };
        let outcome = if self.elapsed >= current.duration() {
            PlaybackOutcome::Completed
        } else {
            PlaybackOutcome::Interrupted
        };
        self.log_current(outcome, actor, None);
    }

    /// Cue `item`, skipping forward past items without playable media
    fn cue(&mut self, item: ScheduleItem, start_offset_seconds: u32, then: Continue) {
        let mut offset = start_offset_seconds;
        let mut candidate = Some(item);

        while let Some(item) = candidate.take() {
            if item.has_playable_media() {
                self.cue_playable(item, offset, then);
                return;
            }
            warn!(
                "[{}] Skipping schedule item {}: {}",
                self.channel_id, item.id, MISSING_MEDIA
            );
            self.log_skipped(&item, MISSING_MEDIA);
            candidate = self.next_candidate_after(&item);
            offset = 0;
        }

        info!("[{}] No playable item left in the day plan", self.channel_id);
        self.go_idle();
    }

    fn cue_playable(&mut self, item: ScheduleItem, start_offset_seconds: u32, then: Continue) {
        let offset = start_offset_seconds.min(item.duration_seconds);
        let locator = item
            .media
            .as_ref()
            .map(|m| m.locator.clone())
            .unwrap_or_default();
        let zero_length = item.duration_seconds == 0;

        info!(
            "[{}] Loading item {} ({}) at +{}s",
            self.channel_id,
            item.id,
            item.media.as_ref().map(|m| m.title.as_str()).unwrap_or(""),
            offset
        );

        self.current = Some(LoadedItem {
            item,
            join_offset: offset,
            loaded_at: self.clock.now_utc(),
            started_at: None,
            logged: false,
        });
        self.elapsed = offset;
        self.status = SessionStatus::Loading;
        self.last_error = None;
        self.refresh_next();

        if let Err(e) = self.player.load(&locator, offset) {
            self.fail_current(e.0);
            return;
        }
        self.apply_mute_policy();

        if zero_length {
            debug!("[{}] Zero-length item completes on load", self.channel_id);
            self.on_item_end(then);
            return;
        }

        match then {
            Continue::Play => self.start_playing(),
            Continue::Pause => self.status = SessionStatus::Paused,
            Continue::Cue => {}
        }
    }

    fn start_playing(&mut self) {
        if self.current.is_none() {
            return;
        }
        if let Err(e) = self.player.play() {
            self.fail_current(e.0);
            return;
        }

        let now = self.clock.now_utc();
        self.status = SessionStatus::Playing;
        if let Some(current) = self.current.as_mut() {
            if current.started_at.is_none() && !current.logged {
                current.started_at = Some(now);
                self.effects.push(SessionEffect::ItemStarted {
                    item_id: current.item.id,
                    media_title: current.item.media_title(),
                });
                self.effects.push(SessionEffect::ItemStatus {
                    item_id: current.item.id,
                    scheduled_date: current.item.scheduled_date,
                    status: ScheduleStatus::Playing,
                });
            }
        }
        self.effects.push(SessionEffect::ChannelStatus(ChannelStatus::OnAir));
    }

    /// The loaded item reached its nominal duration
    fn on_item_end(&mut self, then: Continue) {
        self.log_current(PlaybackOutcome::Completed, PlaybackActor::Schedule, None);

        if !self.auto_advance {
            // End-of-item hold: elapsed stays pinned at the duration
            self.player.pause();
            self.status = SessionStatus::Paused;
            return;
        }

        match self.next.clone() {
            Some(next) => self.cue(next, 0, then),
            None => {
                info!("[{}] End of day plan reached", self.channel_id);
                self.go_idle();
            }
        }
    }

    fn go_idle(&mut self) {
        if self.status == SessionStatus::Idle && self.current.is_none() {
            return;
        }
        self.player.pause();
        self.current = None;
        self.next = None;
        self.elapsed = 0;
        self.status = SessionStatus::Idle;
        self.effects.push(SessionEffect::ChannelStatus(ChannelStatus::OffAir));
    }

    /// Error path: log, hold Paused for inspection, and drop off air. No
    /// auto-advance so a broken feed cannot burn through the day plan.
    fn fail_current(&mut self, message: String) {
        if self.current.is_none() {
            warn!("[{}] Backend failure with nothing loaded: {}", self.channel_id, message);
            return;
        }
        error!("[{}] Playback backend failure: {}", self.channel_id, message);
        self.log_current(PlaybackOutcome::Error, PlaybackActor::Player, Some(message.clone()));
        self.player.pause();
        self.status = SessionStatus::Paused;
        self.last_error = Some(message);
        self.effects.push(SessionEffect::ChannelStatus(ChannelStatus::OffAir));
    }

    fn apply_mute_policy(&mut self) {
        if self.user_has_unmuted {
            self.player.unmute();
            self.muted = false;
        } else {
            self.player.mute();
            self.muted = true;
        }
    }

    fn log_current(
        &mut self,
        outcome: PlaybackOutcome,
        actor: PlaybackActor,
        error_message: Option<String>,
    ) {
        let now = self.clock.now_utc();
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.logged {
            return;
        }
        current.logged = true;

        let entry = PlaybackLogEntry {
            id: Uuid::new_v4(),
            channel_id: self.channel_id,
            schedule_item_id: current.item.id,
            media_id: current.item.media_id(),
            media_title: current.item.media_title(),
            start_time: current.started_at.unwrap_or(current.loaded_at),
            end_time: now,
            elapsed_seconds: self
                .elapsed
                .min(current.item.duration_seconds)
                .saturating_sub(current.join_offset),
            outcome,
            error_message,
            actor,
        };
        let scheduled_date = current.item.scheduled_date;
        self.record(entry, scheduled_date);
    }

    fn log_skipped(&mut self, item: &ScheduleItem, message: &str) {
        if self.finished.contains(&item.id) {
            return;
        }
        let now = self.clock.now_utc();
        let entry = PlaybackLogEntry {
            id: Uuid::new_v4(),
            channel_id: self.channel_id,
            schedule_item_id: item.id,
            media_id: item.media_id(),
            media_title: item.media_title(),
            start_time: now,
            end_time: now,
            elapsed_seconds: 0,
            outcome: PlaybackOutcome::Error,
            error_message: Some(message.to_string()),
            actor: PlaybackActor::Engine,
        };
        self.record(entry, item.scheduled_date);
    }

    fn record(&mut self, entry: PlaybackLogEntry, scheduled_date: NaiveDate) {
        info!(
            "[{}] Item {} finished: {} after {}s",
            self.channel_id, entry.schedule_item_id, entry.outcome, entry.elapsed_seconds
        );
        self.finished.insert(entry.schedule_item_id);
        if let Some(item) = self
            .lineup
            .iter_mut()
            .find(|item| item.id == entry.schedule_item_id)
        {
            item.status = ScheduleStatus::Completed;
        }
        self.effects.push(SessionEffect::Logged {
            entry,
            scheduled_date,
        });
    }
}
