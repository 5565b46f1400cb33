//! Runtime settings for onair-playout
//!
//! Second configuration tier: values stored in the database `settings`
//! table. Bootstrap concerns (database path, port, logging) come from
//! [`onair_common::config`] instead.
//!
//! Missing or NULL settings are initialized with built-in defaults and
//! written back so the table always documents the values in effect.

use crate::db::settings::{get_setting, set_setting};
use crate::error::Result;
use sqlx::SqlitePool;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

const TICK_INTERVAL_RANGE: (u64, u64) = (10, 60_000);
const UPCOMING_LIMIT_RANGE: (usize, usize) = (1, 500);

/// Runtime settings loaded from database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Session tick period; one tick advances elapsed by one second
    pub tick_interval_ms: u64,
    /// Upcoming list length when a caller gives no limit
    pub upcoming_default_limit: usize,
    /// Seed and play every channel at start-up
    pub auto_seed_on_start: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            upcoming_default_limit: DEFAULT_UPCOMING_LIMIT,
            auto_seed_on_start: true,
        }
    }
}

impl RuntimeSettings {
    /// Load runtime settings from database
    ///
    /// For each setting:
    /// 1. Try to read from database
    /// 2. If NULL or missing, use built-in default
    /// 3. Write default back to database for consistency
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let tick_interval_ms =
            load_or_init(pool, "tick_interval_ms", defaults.tick_interval_ms).await?;
        let upcoming_default_limit =
            load_or_init(pool, "upcoming_default_limit", defaults.upcoming_default_limit).await?;
        let auto_seed_on_start =
            load_or_init(pool, "auto_seed_on_start", defaults.auto_seed_on_start).await?;

        let settings = Self {
            tick_interval_ms: clamp_logged(
                "tick_interval_ms",
                tick_interval_ms,
                TICK_INTERVAL_RANGE,
            ),
            upcoming_default_limit: clamp_logged(
                "upcoming_default_limit",
                upcoming_default_limit,
                UPCOMING_LIMIT_RANGE,
            ),
            auto_seed_on_start,
        };

        info!(
            "Loaded runtime settings: tick={}ms, upcoming_limit={}, auto_seed={}",
            settings.tick_interval_ms, settings.upcoming_default_limit, settings.auto_seed_on_start
        );
        Ok(settings)
    }

    /// Session tick period as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

async fn load_or_init<T>(pool: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display + Copy,
{
    match get_setting::<T>(pool, key).await? {
        Some(value) => Ok(value),
        None => {
            info!("Setting '{}' not found in database, using default: {}", key, default);
            set_setting(pool, key, default).await?;
            Ok(default)
        }
    }
}

fn clamp_logged<T: PartialOrd + Display + Copy>(key: &str, value: T, range: (T, T)) -> T {
    let (min, max) = range;
    let clamped = if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    };
    if clamped != value {
        warn!("Setting '{}' = {} out of range, using {}", key, value, clamped);
    }
    clamped
}
