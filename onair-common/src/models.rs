//! Channel, media and schedule records
//!
//! These are plain records handed to the playout engine by the catalog and
//! scheduling processes. The engine reads them; it only ever writes the
//! status columns and the append-only playback log.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum
/// stored as lowercase text.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stored/serialized text form
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        concat!("Unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

/// Broadcast channel kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Tv,
    Radio,
    Web,
}

text_enum!(ChannelKind { Tv => "tv", Radio => "radio", Web => "web" });

/// Channel-level visibility status
///
/// Distinct from the finer-grained session status: a paused session is
/// still on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    OnAir,
    OffAir,
    Standby,
}

text_enum!(ChannelStatus { OnAir => "on_air", OffAir => "off_air", Standby => "standby" });

/// Broadcast channel descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub kind: ChannelKind,
    pub status: ChannelStatus,
    /// Load and play the next scheduled item automatically at item end.
    /// When false the session holds at the end of the item.
    pub auto_advance: bool,
}

/// Media asset kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    Jingle,
    Ad,
    Live,
}

text_enum!(MediaKind {
    Video => "video",
    Audio => "audio",
    Jingle => "jingle",
    Ad => "ad",
    Live => "live",
});

/// Immutable description of a playable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Uuid,
    pub title: String,
    pub kind: MediaKind,
    /// Opaque media locator (URL or equivalent)
    pub locator: String,
    pub thumbnail: Option<String>,
    /// Nominal length in whole seconds
    pub duration_seconds: u32,
}

impl MediaAsset {
    /// A blank locator cannot be handed to a player.
    pub fn is_playable(&self) -> bool {
        !self.locator.trim().is_empty()
    }
}

/// Schedule item lifecycle owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Playing,
    Completed,
}

text_enum!(ScheduleStatus {
    Scheduled => "scheduled",
    Playing => "playing",
    Completed => "completed",
});

/// One entry in a channel's day plan
///
/// `media` is `None` when the referenced asset could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub media: Option<MediaAsset>,
    pub scheduled_date: NaiveDate,
    /// Start time-of-day, local to the channel
    pub scheduled_time: NaiveTime,
    pub duration_seconds: u32,
    /// Tie-break among items sharing a start time
    pub order_position: i64,
    pub status: ScheduleStatus,
}

impl ScheduleItem {
    /// Window start in seconds since local midnight
    pub fn start_seconds(&self) -> u32 {
        self.scheduled_time.num_seconds_from_midnight()
    }

    /// Exclusive window end in seconds since local midnight
    pub fn end_seconds(&self) -> u64 {
        u64::from(self.start_seconds()) + u64::from(self.duration_seconds)
    }

    /// Whether `[start, start + duration)` contains `now_seconds`
    pub fn window_contains(&self, now_seconds: u32) -> bool {
        let now = u64::from(now_seconds);
        u64::from(self.start_seconds()) <= now && now < self.end_seconds()
    }

    /// The item references an asset a player can load
    pub fn has_playable_media(&self) -> bool {
        self.media.as_ref().is_some_and(MediaAsset::is_playable)
    }

    pub fn media_id(&self) -> Option<Uuid> {
        self.media.as_ref().map(|m| m.id)
    }

    pub fn media_title(&self) -> Option<String> {
        self.media.as_ref().map(|m| m.title.clone())
    }
}

/// How a schedule item instance stopped airing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    Completed,
    Interrupted,
    Error,
}

text_enum!(PlaybackOutcome {
    Completed => "completed",
    Interrupted => "interrupted",
    Error => "error",
});

/// Who or what ended an item instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackActor {
    /// Reached its nominal duration on the session tick
    Schedule,
    /// Explicit operator command (skip, select, stop)
    Operator,
    /// Playback backend reported a failure
    Player,
    /// Skipped by the engine because its media reference is unusable
    Engine,
}

text_enum!(PlaybackActor {
    Schedule => "schedule",
    Operator => "operator",
    Player => "player",
    Engine => "engine",
});

/// Append-only record of one aired (or failed) item instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackLogEntry {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub schedule_item_id: Uuid,
    pub media_id: Option<Uuid>,
    /// Title at the time of airing
    pub media_title: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Actual air time, never above the nominal duration
    pub elapsed_seconds: u32,
    pub outcome: PlaybackOutcome,
    pub error_message: Option<String>,
    pub actor: PlaybackActor,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_at(h: u32, m: u32, s: u32, duration: u32) -> ScheduleItem {
        ScheduleItem {
            id: Uuid::new_v4(),
            channel_id: Uuid::nil(),
            media: None,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(h, m, s).unwrap(),
            duration_seconds: duration,
            order_position: 0,
            status: ScheduleStatus::Scheduled,
        }
    }

    #[test]
    fn test_window_is_half_open() {
        let item = item_at(10, 0, 0, 300);
        assert_eq!(item.start_seconds(), 36_000);
        assert!(item.window_contains(36_000));
        assert!(item.window_contains(36_299));
        assert!(!item.window_contains(36_300));
        assert!(!item.window_contains(35_999));
    }

    #[test]
    fn test_zero_duration_window_is_empty() {
        let item = item_at(10, 0, 0, 0);
        assert!(!item.window_contains(36_000));
    }

    #[test]
    fn test_window_may_run_past_midnight() {
        let item = item_at(23, 59, 0, 600);
        assert_eq!(item.end_seconds(), 86_340 + 600);
        assert!(item.window_contains(86_399));
    }

    #[test]
    fn test_blank_locator_is_not_playable() {
        let mut item = item_at(8, 0, 0, 60);
        assert!(!item.has_playable_media());

        item.media = Some(MediaAsset {
            id: Uuid::new_v4(),
            title: "Station ident".to_string(),
            kind: MediaKind::Jingle,
            locator: "   ".to_string(),
            thumbnail: None,
            duration_seconds: 60,
        });
        assert!(!item.has_playable_media());

        if let Some(media) = item.media.as_mut() {
            media.locator = "https://cdn.example/ident.mp3".to_string();
        }
        assert!(item.has_playable_media());
    }

    #[test]
    fn test_status_text_round_trip() {
        assert_eq!(ChannelStatus::OnAir.as_str(), "on_air");
        assert_eq!("off_air".parse::<ChannelStatus>().unwrap(), ChannelStatus::OffAir);
        assert!("live".parse::<ChannelStatus>().is_err());
        assert_eq!("interrupted".parse::<PlaybackOutcome>().unwrap(), PlaybackOutcome::Interrupted);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ChannelStatus::OnAir).unwrap();
        assert_eq!(json, "\"on_air\"");
        let kind: MediaKind = serde_json::from_str("\"jingle\"").unwrap();
        assert_eq!(kind, MediaKind::Jingle);
    }
}
