//! Shared event state
//!
//! Fan-out of `PlayoutEvent`s to SSE clients and in-process subscribers.

use onair_common::events::PlayoutEvent;
use tokio::sync::broadcast;

/// Event buffer per subscriber before it starts lagging
const EVENT_BUFFER: usize = 256;

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<PlayoutEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { event_tx }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: PlayoutEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayoutEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use onair_common::ChannelStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_ok() {
        let state = SharedState::new();
        state.broadcast_event(PlayoutEvent::ChannelStatusChanged {
            channel_id: Uuid::nil(),
            status: ChannelStatus::OffAir,
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        let channel_id = Uuid::new_v4();
        state.broadcast_event(PlayoutEvent::ChannelStatusChanged {
            channel_id,
            status: ChannelStatus::OnAir,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel_id(), channel_id);
    }
}
