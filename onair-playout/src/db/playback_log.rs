//! Playback log queries
//!
//! Append-only: rows are inserted and read, never updated.

use chrono::{DateTime, Utc};
use onair_common::{PlaybackActor, PlaybackLogEntry, PlaybackOutcome};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use super::{parse_guid, seconds_from_db};
use crate::error::{Error, Result};

pub async fn append_entry(db: &Pool<Sqlite>, entry: &PlaybackLogEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO playback_log
            (guid, channel_guid, schedule_item_guid, media_guid, media_title,
             start_time, end_time, elapsed_seconds, outcome, error_message, actor)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.channel_id.to_string())
    .bind(entry.schedule_item_id.to_string())
    .bind(entry.media_id.map(|id| id.to_string()))
    .bind(entry.media_title.as_deref())
    .bind(entry.start_time.to_rfc3339())
    .bind(entry.end_time.to_rfc3339())
    .bind(i64::from(entry.elapsed_seconds))
    .bind(entry.outcome.as_str())
    .bind(entry.error_message.as_deref())
    .bind(entry.actor.as_str())
    .execute(db)
    .await?;

    Ok(())
}

/// Most recent entries for a channel, newest first
pub async fn recent_entries(
    db: &Pool<Sqlite>,
    channel_id: Uuid,
    limit: usize,
) -> Result<Vec<PlaybackLogEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, channel_guid, schedule_item_guid, media_guid, media_title,
               start_time, end_time, elapsed_seconds, outcome, error_message, actor
        FROM playback_log
        WHERE channel_guid = ?
        ORDER BY end_time DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(channel_id.to_string())
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(db)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

fn entry_from_row(row: &SqliteRow) -> Result<PlaybackLogEntry> {
    let guid: String = row.try_get("guid")?;
    let channel_guid: String = row.try_get("channel_guid")?;
    let item_guid: String = row.try_get("schedule_item_guid")?;
    let media_guid: Option<String> = row.try_get("media_guid")?;
    let start_time: String = row.try_get("start_time")?;
    let end_time: String = row.try_get("end_time")?;
    let elapsed: i64 = row.try_get("elapsed_seconds")?;
    let outcome: String = row.try_get("outcome")?;
    let actor: String = row.try_get("actor")?;

    Ok(PlaybackLogEntry {
        id: parse_guid("log guid", &guid)?,
        channel_id: parse_guid("channel guid", &channel_guid)?,
        schedule_item_id: parse_guid("schedule item guid", &item_guid)?,
        media_id: media_guid
            .as_deref()
            .map(|g| parse_guid("media guid", g))
            .transpose()?,
        media_title: row.try_get("media_title")?,
        start_time: parse_timestamp(&start_time)?,
        end_time: parse_timestamp(&end_time)?,
        elapsed_seconds: seconds_from_db("elapsed_seconds", elapsed),
        outcome: outcome.parse::<PlaybackOutcome>()?,
        error_message: row.try_get("error_message")?,
        actor: actor.parse::<PlaybackActor>()?,
    })
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Store(format!("Invalid timestamp '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        onair_common::db::init_schema(&pool).await.unwrap();
        pool
    }

    fn entry(channel_id: Uuid, minute: u32, outcome: PlaybackOutcome) -> PlaybackLogEntry {
        PlaybackLogEntry {
            id: Uuid::new_v4(),
            channel_id,
            schedule_item_id: Uuid::new_v4(),
            media_id: Some(Uuid::new_v4()),
            media_title: Some("Morning Show".to_string()),
            start_time: Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 5, 1, 9, minute + 1, 0).unwrap(),
            elapsed_seconds: 60,
            outcome,
            error_message: None,
            actor: PlaybackActor::Schedule,
        }
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let db = setup_test_db().await;
        let channel_id = Uuid::new_v4();
        let mut failed = entry(channel_id, 5, PlaybackOutcome::Error);
        failed.error_message = Some("unreachable locator".to_string());
        failed.actor = PlaybackActor::Player;
        failed.media_id = None;

        append_entry(&db, &entry(channel_id, 0, PlaybackOutcome::Completed))
            .await
            .unwrap();
        append_entry(&db, &failed).await.unwrap();

        let entries = recent_entries(&db, channel_id, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], failed);
        assert_eq!(entries[1].outcome, PlaybackOutcome::Completed);
    }

    #[tokio::test]
    async fn test_limit_and_channel_filter() {
        let db = setup_test_db().await;
        let channel_id = Uuid::new_v4();
        for minute in 0..5 {
            append_entry(&db, &entry(channel_id, minute, PlaybackOutcome::Completed))
                .await
                .unwrap();
        }
        append_entry(&db, &entry(Uuid::new_v4(), 0, PlaybackOutcome::Completed))
            .await
            .unwrap();

        assert_eq!(recent_entries(&db, channel_id, 3).await.unwrap().len(), 3);
        assert_eq!(recent_entries(&db, channel_id, 100).await.unwrap().len(), 5);
    }
}
