//! Core playout engine - construction, channel runtimes, effect application
//!
//! **Responsibilities:**
//! - PlayoutEngine struct definition and initialization
//! - Per-channel runtime creation and seeding from the resolver
//! - Applying session effects (logger, status manager, cache, events)
//! - Ticker restart after each state-changing command
//! - Start-up and shutdown

use chrono::{NaiveDate, NaiveTime, Utc};
use onair_common::events::{PlayoutEvent, SessionStatus};
use onair_common::time::{seconds_since_midnight, Clock};
use onair_common::{Channel, ChannelStatus, ScheduleStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RuntimeSettings;
use crate::error::Result;
use crate::playback::logger::PlaybackLogger;
use crate::playback::player::PlayerFactory;
use crate::playback::session::{PlaybackSession, SessionEffect, SessionSnapshot};
use crate::playback::status::ChannelStatusManager;
use crate::playback::ticker::Ticker;
use crate::schedule::{resolve, PlaylistCache};
use crate::state::SharedState;
use crate::store::PlayoutStore;

/// Session plus the ticker driving it, guarded together
pub(crate) struct SessionCell {
    pub(crate) session: PlaybackSession,
    pub(crate) ticker: Ticker,
    /// Day whose plan the session's lineup was built from
    pub(crate) date: NaiveDate,
}

/// Everything the engine keeps for one open channel
pub(crate) struct ChannelRuntime {
    channel_id: Uuid,
    cell: Mutex<SessionCell>,
}

impl ChannelRuntime {
    pub(crate) fn channel_id(&self) -> Uuid {
        self.channel_id
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionCell> {
        self.cell.lock().await
    }
}

/// Routes session effects to their collaborators
#[derive(Clone)]
pub(crate) struct EffectSink {
    logger: PlaybackLogger,
    status: Arc<ChannelStatusManager>,
    cache: Arc<PlaylistCache>,
    state: Arc<SharedState>,
}

impl EffectSink {
    /// Drain and apply everything the session queued, then announce the
    /// resulting session state
    pub(crate) fn apply(&self, session: &mut PlaybackSession) {
        let channel_id = session.channel_id();

        for effect in session.take_effects() {
            match effect {
                SessionEffect::Logged {
                    entry,
                    scheduled_date,
                } => {
                    let item_id = entry.schedule_item_id;
                    let outcome = entry.outcome;
                    let elapsed_seconds = entry.elapsed_seconds;
                    self.cache
                        .mark_status(channel_id, scheduled_date, item_id, ScheduleStatus::Completed);
                    self.logger.log(entry);
                    self.state.broadcast_event(PlayoutEvent::ItemFinished {
                        channel_id,
                        item_id,
                        outcome,
                        elapsed_seconds,
                        timestamp: Utc::now(),
                    });
                }
                SessionEffect::ItemStatus {
                    item_id,
                    scheduled_date,
                    status,
                } => {
                    self.cache.mark_status(channel_id, scheduled_date, item_id, status);
                    self.logger.mark_item(item_id, status);
                }
                SessionEffect::ItemStarted {
                    item_id,
                    media_title,
                } => {
                    self.state.broadcast_event(PlayoutEvent::ItemStarted {
                        channel_id,
                        item_id,
                        media_title,
                        timestamp: Utc::now(),
                    });
                }
                SessionEffect::ChannelStatus(status) => {
                    self.status.set_status(channel_id, status);
                }
            }
        }

        self.state.broadcast_event(PlayoutEvent::SessionChanged {
            channel_id,
            status: session.status(),
            item_id: session.current_item().map(|item| item.id),
            elapsed_seconds: session.elapsed_seconds(),
            timestamp: Utc::now(),
        });
    }
}

/// Playout engine
///
/// Owns one session per open channel. Commands, ticks and queries for a
/// channel serialize on that channel's session lock; different channels
/// never contend.
pub struct PlayoutEngine {
    pub(super) store: Arc<dyn PlayoutStore>,
    pub(super) cache: Arc<PlaylistCache>,
    pub(super) status: Arc<ChannelStatusManager>,
    pub(super) logger: PlaybackLogger,
    pub(super) state: Arc<SharedState>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) players: Arc<dyn PlayerFactory>,
    pub(super) settings: RuntimeSettings,
    pub(super) sink: EffectSink,
    pub(super) channels: RwLock<HashMap<Uuid, Arc<ChannelRuntime>>>,
}

impl PlayoutEngine {
    /// Create the engine; spawns the logger and status writer tasks, so it
    /// must be called inside a tokio runtime
    pub fn new(
        store: Arc<dyn PlayoutStore>,
        settings: RuntimeSettings,
        clock: Arc<dyn Clock>,
        players: Arc<dyn PlayerFactory>,
        state: Arc<SharedState>,
    ) -> Self {
        let cache = Arc::new(PlaylistCache::new(Arc::clone(&store)));
        let status = Arc::new(ChannelStatusManager::new(
            Arc::clone(&store),
            Arc::clone(&state),
        ));
        let logger = PlaybackLogger::new(Arc::clone(&store));
        let sink = EffectSink {
            logger: logger.clone(),
            status: Arc::clone(&status),
            cache: Arc::clone(&cache),
            state: Arc::clone(&state),
        };

        Self {
            store,
            cache,
            status,
            logger,
            state,
            clock,
            players,
            settings,
            sink,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn playlist_cache(&self) -> &PlaylistCache {
        &self.cache
    }

    /// Receive every event the engine broadcasts from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayoutEvent> {
        self.state.subscribe_events()
    }

    /// Open a channel: seed its session from the schedule at the clock's
    /// current instant and bring the stored status in line with it
    ///
    /// Opening an already open channel returns its current state.
    pub async fn open_channel(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        let runtime = self.ensure_runtime(channel_id).await?;
        let cell = runtime.lock().await;
        self.reconcile_status(&cell.session);
        Ok(cell.session.snapshot())
    }

    /// Open every known channel, playing each when `auto_seed_on_start` is
    /// set; returns how many channels were opened
    pub async fn start_all(&self) -> Result<usize> {
        let channels = self.store.fetch_channels().await?;
        let mut opened = 0;

        for channel in channels {
            let result = if self.settings.auto_seed_on_start {
                match self.ensure_runtime(channel.id).await {
                    Ok(_) => self.play(channel.id).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            } else {
                self.open_channel(channel.id).await.map(|_| ())
            };

            match result {
                Ok(()) => {
                    opened += 1;
                    info!("Channel '{}' ({}) opened", channel.name, channel.id);
                }
                Err(e) => warn!("Failed to open channel '{}' ({}): {}", channel.name, channel.id, e),
            }
        }

        Ok(opened)
    }

    /// Re-read the channel descriptor and today's plan after external edits
    ///
    /// The loaded item keeps playing; an Idle session is re-seeded.
    pub async fn reload_channel(&self, channel_id: Uuid) -> Result<SessionSnapshot> {
        let channel = self.store.fetch_channel(channel_id).await?;
        let dropped = self.cache.invalidate_channel(channel_id);
        debug!("Reload of channel {} dropped {} cached day plans", channel_id, dropped);

        let runtime = self.ensure_runtime(channel_id).await?;
        let mut cell = runtime.lock().await;
        let epoch = cell.session.epoch();

        let now = self.clock.now_local();
        let playlist = self.cache.get(channel_id, now.date()).await?;
        cell.date = now.date();
        cell.session.set_auto_advance(channel.auto_advance);
        cell.session.set_lineup(playlist.to_vec());
        if cell.session.status() == SessionStatus::Idle {
            seed_session(&mut cell.session, now.time());
        }

        self.finish_command(&runtime, &mut cell, epoch);
        info!("Channel {} reloaded", channel_id);
        Ok(cell.session.snapshot())
    }

    /// Cancel every ticker and wait for queued writes to be attempted
    pub async fn shutdown(&self) {
        info!("Shutting down playout engine");
        let runtimes: Vec<Arc<ChannelRuntime>> =
            self.channels.read().await.values().cloned().collect();
        for runtime in runtimes {
            runtime.lock().await.ticker.cancel();
        }
        self.logger.flush().await;
        self.status.flush().await;
    }

    /// Wait until queued log and status writes have been attempted
    pub async fn flush(&self) {
        self.logger.flush().await;
        self.status.flush().await;
    }

    /// Runtime for `channel_id`, created and seeded on first use
    pub(super) async fn ensure_runtime(&self, channel_id: Uuid) -> Result<Arc<ChannelRuntime>> {
        if let Some(runtime) = self.channels.read().await.get(&channel_id) {
            return Ok(Arc::clone(runtime));
        }

        let channel = self.store.fetch_channel(channel_id).await?;
        let mut channels = self.channels.write().await;
        if let Some(runtime) = channels.get(&channel_id) {
            return Ok(Arc::clone(runtime));
        }

        let runtime = Arc::new(self.build_runtime(&channel).await?);
        channels.insert(channel_id, Arc::clone(&runtime));
        Ok(runtime)
    }

    async fn build_runtime(&self, channel: &Channel) -> Result<ChannelRuntime> {
        let now = self.clock.now_local();
        let date = now.date();
        let playlist = self.cache.get(channel.id, date).await?;

        self.status.seed(channel.id, channel.status);

        let mut session = PlaybackSession::new(
            channel,
            self.players.create(channel),
            Arc::clone(&self.clock),
        );
        session.set_lineup(playlist.to_vec());
        seed_session(&mut session, now.time());
        self.sink.apply(&mut session);

        info!(
            "Opened channel '{}' ({}): {} items on {}, session {}",
            channel.name,
            channel.id,
            playlist.len(),
            date,
            session.status()
        );

        Ok(ChannelRuntime {
            channel_id: channel.id,
            cell: Mutex::new(SessionCell {
                session,
                ticker: Ticker::new(),
                date,
            }),
        })
    }

    /// Run `f` against the channel's session, then apply its effects and
    /// restart the ticker if the command moved the epoch
    pub(super) async fn with_session<T>(
        &self,
        channel_id: Uuid,
        f: impl FnOnce(&mut PlaybackSession) -> Result<T>,
    ) -> Result<T> {
        let runtime = self.ensure_runtime(channel_id).await?;
        let mut cell = runtime.lock().await;
        let epoch = cell.session.epoch();

        self.roll_over(&mut cell).await?;
        let result = f(&mut cell.session);

        self.finish_command(&runtime, &mut cell, epoch);
        result
    }

    /// Apply effects and (re)start or cancel the ticker for the new state
    pub(super) fn finish_command(
        &self,
        runtime: &Arc<ChannelRuntime>,
        cell: &mut SessionCell,
        epoch_before: u64,
    ) {
        self.sink.apply(&mut cell.session);

        let epoch = cell.session.epoch();
        let playing = cell.session.status() == SessionStatus::Playing;
        if epoch == epoch_before && cell.ticker.is_running() == playing {
            return;
        }

        cell.ticker.cancel();
        if playing {
            cell.ticker.restart(
                Arc::downgrade(runtime),
                self.sink.clone(),
                self.settings.tick_interval(),
                epoch,
            );
        }
    }

    /// Switch the lineup to the clock's day once it has moved on
    async fn roll_over(&self, cell: &mut SessionCell) -> Result<()> {
        let now = self.clock.now_local();
        if now.date() == cell.date {
            return Ok(());
        }

        let channel_id = cell.session.channel_id();
        info!("Channel {} rolling over from {} to {}", channel_id, cell.date, now.date());
        let playlist = self.cache.get(channel_id, now.date()).await?;
        cell.date = now.date();
        cell.session.set_lineup(playlist.to_vec());
        if cell.session.status() == SessionStatus::Idle {
            seed_session(&mut cell.session, now.time());
        }
        Ok(())
    }

    /// A stored on_air status with nothing airing (e.g. after a crash)
    /// is corrected to off_air
    fn reconcile_status(&self, session: &PlaybackSession) {
        let channel_id = session.channel_id();
        let airing = matches!(
            session.status(),
            SessionStatus::Playing | SessionStatus::Paused
        );
        if !airing && self.status.get_status(channel_id) == Some(ChannelStatus::OnAir) {
            info!("Channel {} stored as on_air with nothing airing; setting off_air", channel_id);
            self.status.set_status(channel_id, ChannelStatus::OffAir);
        }
    }
}

/// Load the item the schedule says is airing at `now`, joining it at the
/// right offset. An item already completed earlier in the day is not
/// replayed; the next unfinished one is cued from the top instead.
fn seed_session(session: &mut PlaybackSession, now: NaiveTime) {
    let now_seconds = seconds_since_midnight(now);
    let resolution = resolve(session.lineup(), now_seconds);

    let Some(current) = resolution.current.clone() else {
        debug!("[{}] Nothing to seed at {}", session.channel_id(), now);
        return;
    };

    if session.is_finished(current.id) {
        match session.next_candidate_after(&current) {
            Some(next) => session.load(next),
            None => debug!("[{}] Day plan already aired", session.channel_id()),
        }
        return;
    }

    let offset = resolution.offset_into_current(now_seconds);
    session.load_at(current, offset);
}
