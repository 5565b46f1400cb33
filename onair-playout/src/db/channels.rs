//! Channel queries

use onair_common::{Channel, ChannelKind, ChannelStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use super::parse_guid;
use crate::error::{Error, Result};

pub async fn get_channel(db: &Pool<Sqlite>, channel_id: Uuid) -> Result<Channel> {
    let row = sqlx::query(
        "SELECT guid, name, kind, status, auto_advance FROM channels WHERE guid = ?",
    )
    .bind(channel_id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or(Error::ChannelNotFound(channel_id))?;

    channel_from_row(&row)
}

/// Every channel, ordered by name
pub async fn list_channels(db: &Pool<Sqlite>) -> Result<Vec<Channel>> {
    let rows = sqlx::query(
        "SELECT guid, name, kind, status, auto_advance FROM channels ORDER BY name, guid",
    )
    .fetch_all(db)
    .await?;

    rows.iter().map(channel_from_row).collect()
}

pub async fn insert_channel(db: &Pool<Sqlite>, channel: &Channel) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO channels (guid, name, kind, status, auto_advance)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(channel.id.to_string())
    .bind(&channel.name)
    .bind(channel.kind.as_str())
    .bind(channel.status.as_str())
    .bind(channel.auto_advance)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn update_channel_status(
    db: &Pool<Sqlite>,
    channel_id: Uuid,
    status: ChannelStatus,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE channels SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(status.as_str())
    .bind(channel_id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::ChannelNotFound(channel_id));
    }
    Ok(())
}

fn channel_from_row(row: &SqliteRow) -> Result<Channel> {
    let guid: String = row.try_get("guid")?;
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let auto_advance: i64 = row.try_get("auto_advance")?;

    Ok(Channel {
        id: parse_guid("channel guid", &guid)?,
        name: row.try_get("name")?,
        kind: kind.parse::<ChannelKind>()?,
        status: status.parse::<ChannelStatus>()?,
        auto_advance: auto_advance != 0,
    })
}
