//! Wall-clock helpers
//!
//! Scheduling works in channel-local naive time ("seconds since local
//! midnight"); log records carry UTC timestamps. The `Clock` seam lets the
//! engine run against a simulated clock in tests.

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, Timelike, Utc};
use std::sync::Mutex;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds elapsed since local midnight for a time of day
pub fn seconds_since_midnight(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight()
}

/// Source of "now" for the playout engine
pub trait Clock: Send + Sync {
    /// Channel-local wall-clock instant
    fn now_local(&self) -> NaiveDateTime;

    /// UTC instant used for log timestamps
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Host wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
///
/// The local instant is also reported as UTC, so log timestamps line up
/// with the simulated schedule.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now_local(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.now_local().and_utc()
    }
}
