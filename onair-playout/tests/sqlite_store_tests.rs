//! SqliteStore tests against a real database file

mod helpers;

use helpers::*;
use onair_common::db::init_database;
use onair_common::events::SessionStatus;
use onair_common::time::ManualClock;
use onair_common::{ChannelStatus, PlaybackOutcome, ScheduleStatus};
use onair_playout::config::RuntimeSettings;
use onair_playout::db::{channels, schedule, settings, SqliteStore};
use onair_playout::store::PlayoutStore;
use onair_playout::{PlayoutEngine, SharedState};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

async fn setup() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("onair.db")).await.unwrap();
    (dir, pool)
}

#[tokio::test]
async fn test_day_plan_joins_media() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool.clone());

    let ch = channel("News", true);
    channels::insert_channel(&pool, &ch).await.unwrap();

    let aired = item(ch.id, "Morning News", (10, 0, 0), 300);
    let orphan = item(ch.id, "Deleted Asset", (10, 5, 0), 120);
    schedule::insert_media_asset(&pool, aired.media.as_ref().unwrap())
        .await
        .unwrap();
    schedule::insert_schedule_item(&pool, &aired, aired.media_id())
        .await
        .unwrap();
    // Asset never written: the reference dangles
    schedule::insert_schedule_item(&pool, &orphan, Some(Uuid::new_v4()))
        .await
        .unwrap();

    let items = store.fetch_schedule(ch.id, test_date()).await.unwrap();
    assert_eq!(items.len(), 2);

    let first = items.iter().find(|i| i.id == aired.id).unwrap();
    assert_eq!(first.media, aired.media);
    assert_eq!(first.scheduled_time, aired.scheduled_time);
    assert!(first.has_playable_media());

    let second = items.iter().find(|i| i.id == orphan.id).unwrap();
    assert!(second.media.is_none());

    let other_day = store
        .fetch_schedule(ch.id, test_date().succ_opt().unwrap())
        .await
        .unwrap();
    assert!(other_day.is_empty());
}

#[tokio::test]
async fn test_status_writes() {
    let (_dir, pool) = setup().await;
    let store = SqliteStore::new(pool.clone());

    let ch = channel("News", true);
    channels::insert_channel(&pool, &ch).await.unwrap();
    let it = item(ch.id, "Morning News", (10, 0, 0), 300);
    schedule::insert_schedule_item(&pool, &it, None).await.unwrap();

    store
        .update_channel_status(ch.id, ChannelStatus::OnAir)
        .await
        .unwrap();
    assert_eq!(
        store.fetch_channel(ch.id).await.unwrap().status,
        ChannelStatus::OnAir
    );

    store
        .update_schedule_item_status(it.id, ScheduleStatus::Completed)
        .await
        .unwrap();
    let items = store.fetch_schedule(ch.id, test_date()).await.unwrap();
    assert_eq!(items[0].status, ScheduleStatus::Completed);

    assert!(store
        .update_channel_status(Uuid::new_v4(), ChannelStatus::OnAir)
        .await
        .is_err());
}

#[tokio::test]
async fn test_settings_defaults_are_written_back() {
    let (_dir, pool) = setup().await;

    let loaded = RuntimeSettings::load(&pool).await.unwrap();
    assert_eq!(loaded, RuntimeSettings::default());

    let stored: Option<u64> = settings::get_setting(&pool, "tick_interval_ms").await.unwrap();
    assert_eq!(stored, Some(loaded.tick_interval_ms));
}

#[tokio::test]
async fn test_engine_over_sqlite() {
    let (_dir, pool) = setup().await;

    let ch = channel("News", true);
    channels::insert_channel(&pool, &ch).await.unwrap();
    let a = item(ch.id, "Morning News", (10, 0, 0), 300);
    let b = item(ch.id, "Weather", (10, 5, 0), 300);
    for it in [&a, &b] {
        schedule::insert_media_asset(&pool, it.media.as_ref().unwrap())
            .await
            .unwrap();
        schedule::insert_schedule_item(&pool, it, it.media_id())
            .await
            .unwrap();
    }

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let engine = PlayoutEngine::new(
        store.clone(),
        RuntimeSettings {
            auto_seed_on_start: false,
            ..RuntimeSettings::default()
        },
        Arc::new(ManualClock::new(at(10, 1, 0))),
        Arc::new(RecordingPlayerFactory::new()),
        Arc::new(SharedState::new()),
    );

    let snapshot = engine.play(ch.id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Playing);
    assert_eq!(snapshot.elapsed_seconds, 60);

    engine.skip(ch.id).await.unwrap();
    engine.flush().await;

    let history = engine.get_playback_history(ch.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].schedule_item_id, a.id);
    assert_eq!(history[0].outcome, PlaybackOutcome::Interrupted);
    // Joined at +60s and skipped before a tick
    assert_eq!(history[0].elapsed_seconds, 0);

    assert_eq!(
        store.fetch_channel(ch.id).await.unwrap().status,
        ChannelStatus::OnAir
    );
    let items = store.fetch_schedule(ch.id, test_date()).await.unwrap();
    let status_of = |id| items.iter().find(|i| i.id == id).map(|i| i.status);
    assert_eq!(status_of(a.id), Some(ScheduleStatus::Completed));
    assert_eq!(status_of(b.id), Some(ScheduleStatus::Playing));

    engine.shutdown().await;
}
