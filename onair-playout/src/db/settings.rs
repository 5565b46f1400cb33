//! Settings database access
//!
//! Read/write runtime settings in the `settings` key/value table.

use crate::error::{Error, Result};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// Generic setting getter
///
/// Returns None if the key is missing or its value is NULL; a value that
/// does not parse as `T` is a configuration error.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    match value.flatten() {
        Some(s) => match s.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn test_get_missing_setting() {
        let db = setup_test_db().await;
        let value: Option<u64> = get_setting(&db, "nope").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_then_overwrite() {
        let db = setup_test_db().await;

        set_setting(&db, "tick_interval_ms", 250u64).await.unwrap();
        assert_eq!(get_setting::<u64>(&db, "tick_interval_ms").await.unwrap(), Some(250));

        set_setting(&db, "tick_interval_ms", 500u64).await.unwrap();
        assert_eq!(get_setting::<u64>(&db, "tick_interval_ms").await.unwrap(), Some(500));
    }

    #[tokio::test]
    async fn test_unparseable_value_is_config_error() {
        let db = setup_test_db().await;
        set_setting(&db, "tick_interval_ms", "fast").await.unwrap();

        let result = get_setting::<u64>(&db, "tick_interval_ms").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_null_value_reads_as_missing() {
        let db = setup_test_db().await;
        sqlx::query("INSERT INTO settings (key, value) VALUES ('auto_seed_on_start', NULL)")
            .execute(&db)
            .await
            .unwrap();

        assert_eq!(get_setting::<bool>(&db, "auto_seed_on_start").await.unwrap(), None);
    }
}
