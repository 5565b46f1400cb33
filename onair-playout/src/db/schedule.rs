//! Day plan and media asset queries
//!
//! Dates are stored as `YYYY-MM-DD` and start times as `HH:MM:SS` text.
//! A row that cannot be decoded is skipped with a warning: a malformed
//! schedule degrades the day plan, it never fails the channel.

use chrono::{NaiveDate, NaiveTime};
use onair_common::{MediaAsset, MediaKind, ScheduleItem, ScheduleStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::warn;
use uuid::Uuid;

use super::{parse_guid, seconds_from_db};
use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// A channel's day plan, each item joined with its media asset when the
/// reference resolves. Order is by start time only; callers sort fully.
pub async fn get_day_schedule(
    db: &Pool<Sqlite>,
    channel_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<ScheduleItem>> {
    let rows = sqlx::query(
        r#"
        SELECT s.guid, s.channel_guid, s.scheduled_date, s.scheduled_time,
               s.duration_seconds, s.order_position, s.status,
               m.guid AS media_guid, m.title AS media_title, m.kind AS media_kind,
               m.locator AS media_locator, m.thumbnail AS media_thumbnail,
               m.duration_seconds AS media_duration
        FROM schedule_items s
        LEFT JOIN media_assets m ON m.guid = s.media_guid
        WHERE s.channel_guid = ? AND s.scheduled_date = ?
        ORDER BY s.scheduled_time, s.order_position
        "#,
    )
    .bind(channel_id.to_string())
    .bind(date.format(DATE_FORMAT).to_string())
    .fetch_all(db)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        match item_from_row(row) {
            Ok(item) => items.push(item),
            Err(e) => warn!("Skipping undecodable schedule row for channel {}: {}", channel_id, e),
        }
    }
    Ok(items)
}

pub async fn insert_media_asset(db: &Pool<Sqlite>, media: &MediaAsset) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO media_assets (guid, title, kind, locator, thumbnail, duration_seconds)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(media.id.to_string())
    .bind(&media.title)
    .bind(media.kind.as_str())
    .bind(&media.locator)
    .bind(media.thumbnail.as_deref())
    .bind(i64::from(media.duration_seconds))
    .execute(db)
    .await?;

    Ok(())
}

/// Insert a schedule item referencing `media_id` (which need not exist)
pub async fn insert_schedule_item(
    db: &Pool<Sqlite>,
    item: &ScheduleItem,
    media_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO schedule_items
            (guid, channel_guid, media_guid, scheduled_date, scheduled_time,
             duration_seconds, order_position, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(item.channel_id.to_string())
    .bind(media_id.map(|id| id.to_string()))
    .bind(item.scheduled_date.format(DATE_FORMAT).to_string())
    .bind(item.scheduled_time.format(TIME_FORMAT).to_string())
    .bind(i64::from(item.duration_seconds))
    .bind(item.order_position)
    .bind(item.status.as_str())
    .execute(db)
    .await?;

    Ok(())
}

pub async fn update_item_status(
    db: &Pool<Sqlite>,
    item_id: Uuid,
    status: ScheduleStatus,
) -> Result<()> {
    let result = sqlx::query("UPDATE schedule_items SET status = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(item_id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::ItemNotFound(item_id));
    }
    Ok(())
}

fn item_from_row(row: &SqliteRow) -> Result<ScheduleItem> {
    let guid: String = row.try_get("guid")?;
    let channel_guid: String = row.try_get("channel_guid")?;
    let date: String = row.try_get("scheduled_date")?;
    let time: String = row.try_get("scheduled_time")?;
    let duration: i64 = row.try_get("duration_seconds")?;
    let status: String = row.try_get("status")?;

    Ok(ScheduleItem {
        id: parse_guid("schedule item guid", &guid)?,
        channel_id: parse_guid("channel guid", &channel_guid)?,
        media: media_from_row(row),
        scheduled_date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|e| Error::Store(format!("Invalid scheduled_date '{}': {}", date, e)))?,
        scheduled_time: parse_time(&time)?,
        duration_seconds: seconds_from_db("duration_seconds", duration),
        order_position: row.try_get("order_position")?,
        status: status.parse::<ScheduleStatus>()?,
    })
}

/// The joined asset, or None when the reference does not resolve to a
/// usable record
fn media_from_row(row: &SqliteRow) -> Option<MediaAsset> {
    let guid: Option<String> = row.try_get("media_guid").ok().flatten();
    let guid = guid?;

    let decoded = (|| -> Result<MediaAsset> {
        let kind: String = row.try_get("media_kind")?;
        let duration: i64 = row.try_get("media_duration")?;
        Ok(MediaAsset {
            id: parse_guid("media guid", &guid)?,
            title: row.try_get("media_title")?,
            kind: kind.parse::<MediaKind>()?,
            locator: row.try_get("media_locator")?,
            thumbnail: row.try_get("media_thumbnail")?,
            duration_seconds: seconds_from_db("media duration_seconds", duration),
        })
    })();

    match decoded {
        Ok(media) => Some(media),
        Err(e) => {
            warn!("Media asset {} unusable: {}", guid, e);
            None
        }
    }
}

fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|e| Error::Store(format!("Invalid scheduled_time '{}': {}", text, e)))
}
