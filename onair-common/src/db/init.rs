//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and creates the playout
//! tables. Every statement is idempotent so this runs on every start.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows the status/log writers to proceed while queries read
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all playout tables on an open pool
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_channels_table(pool).await?;
    create_media_assets_table(pool).await?;
    create_schedule_items_table(pool).await?;
    create_playback_log_table(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_channels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('tv', 'radio', 'web')),
            status TEXT NOT NULL DEFAULT 'off_air'
                CHECK (status IN ('on_air', 'off_air', 'standby')),
            auto_advance INTEGER NOT NULL DEFAULT 1,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_media_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_assets (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('video', 'audio', 'jingle', 'ad', 'live')),
            locator TEXT NOT NULL,
            thumbnail TEXT,
            duration_seconds INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_schedule_items_table(pool: &SqlitePool) -> Result<()> {
    // media_guid is deliberately not a foreign key: the catalog may delete
    // assets that are still scheduled.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_items (
            guid TEXT PRIMARY KEY,
            channel_guid TEXT NOT NULL REFERENCES channels(guid) ON DELETE CASCADE,
            media_guid TEXT,
            scheduled_date TEXT NOT NULL,
            scheduled_time TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL DEFAULT 0,
            order_position INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'scheduled'
                CHECK (status IN ('scheduled', 'playing', 'completed'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_schedule_channel_date \
         ON schedule_items(channel_guid, scheduled_date)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_playback_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playback_log (
            guid TEXT PRIMARY KEY,
            channel_guid TEXT NOT NULL,
            schedule_item_guid TEXT NOT NULL,
            media_guid TEXT,
            media_title TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            elapsed_seconds INTEGER NOT NULL,
            outcome TEXT NOT NULL CHECK (outcome IN ('completed', 'interrupted', 'error')),
            error_message TEXT,
            actor TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_playback_log_channel \
         ON playback_log(channel_guid, start_time)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
