//! Event types broadcast by the playout engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{ChannelStatus, PlaybackOutcome};

/// Playback session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No item loaded
    Idle,
    /// Item selected, media not yet playing
    Loading,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Playing => write!(f, "playing"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Playout event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayoutEvent {
    /// Session status, item or position changed after a command or tick
    SessionChanged {
        channel_id: Uuid,
        status: SessionStatus,
        item_id: Option<Uuid>,
        elapsed_seconds: u32,
        timestamp: DateTime<Utc>,
    },

    /// An item instance entered Playing for the first time
    ItemStarted {
        channel_id: Uuid,
        item_id: Uuid,
        media_title: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// An item instance reached a terminal transition and was logged
    ItemFinished {
        channel_id: Uuid,
        item_id: Uuid,
        outcome: PlaybackOutcome,
        elapsed_seconds: u32,
        timestamp: DateTime<Utc>,
    },

    /// Channel visibility changed
    ChannelStatusChanged {
        channel_id: Uuid,
        status: ChannelStatus,
        timestamp: DateTime<Utc>,
    },

    /// A cached day playlist was dropped and will be refetched
    PlaylistInvalidated {
        channel_id: Uuid,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
}

impl PlayoutEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayoutEvent::SessionChanged { .. } => "SessionChanged",
            PlayoutEvent::ItemStarted { .. } => "ItemStarted",
            PlayoutEvent::ItemFinished { .. } => "ItemFinished",
            PlayoutEvent::ChannelStatusChanged { .. } => "ChannelStatusChanged",
            PlayoutEvent::PlaylistInvalidated { .. } => "PlaylistInvalidated",
        }
    }

    pub fn channel_id(&self) -> Uuid {
        match self {
            PlayoutEvent::SessionChanged { channel_id, .. }
            | PlayoutEvent::ItemStarted { channel_id, .. }
            | PlayoutEvent::ItemFinished { channel_id, .. }
            | PlayoutEvent::ChannelStatusChanged { channel_id, .. }
            | PlayoutEvent::PlaylistInvalidated { channel_id, .. } => *channel_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayoutEvent::ChannelStatusChanged {
            channel_id: Uuid::nil(),
            status: ChannelStatus::OnAir,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ChannelStatusChanged");
        assert_eq!(json["status"], "on_air");
        assert_eq!(event.event_type(), "ChannelStatusChanged");
    }

    #[test]
    fn test_session_status_display() {
        assert_eq!(SessionStatus::Paused.to_string(), "paused");
        assert_eq!(serde_json::to_string(&SessionStatus::Idle).unwrap(), "\"idle\"");
    }
}
