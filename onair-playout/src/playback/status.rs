//! Channel status manager
//!
//! Holds the on_air/off_air/standby status of every open channel. A status
//! write is queued to the store only when the value actually changes, so
//! repeated Pause/Play or Stop commands never flood the store. Writes go
//! through a single writer task and reach the store in the order they were
//! issued; failures are logged and not retried.

use chrono::Utc;
use onair_common::events::PlayoutEvent;
use onair_common::ChannelStatus;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::SharedState;
use crate::store::PlayoutStore;

enum StatusOp {
    Write(Uuid, ChannelStatus),
    Flush(oneshot::Sender<()>),
}

pub struct ChannelStatusManager {
    statuses: RwLock<HashMap<Uuid, ChannelStatus>>,
    writer: mpsc::UnboundedSender<StatusOp>,
    state: Arc<SharedState>,
}

impl ChannelStatusManager {
    /// Create the manager and spawn its writer task (requires a runtime)
    pub fn new(store: Arc<dyn PlayoutStore>, state: Arc<SharedState>) -> Self {
        let (writer, mut rx) = mpsc::unbounded_channel::<StatusOp>();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    StatusOp::Write(channel_id, status) => {
                        if let Err(e) = store.update_channel_status(channel_id, status).await {
                            warn!(
                                "Failed to persist status {} for channel {}: {}",
                                status, channel_id, e
                            );
                        }
                    }
                    StatusOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Channel status writer stopped");
        });

        Self {
            statuses: RwLock::new(HashMap::new()),
            writer,
            state,
        }
    }

    /// Record the persisted status without writing it back
    pub fn seed(&self, channel_id: Uuid, status: ChannelStatus) {
        self.statuses
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel_id)
            .or_insert(status);
    }

    /// Set a channel's status; returns true if it changed
    ///
    /// Unchanged values produce no store write and no event.
    pub fn set_status(&self, channel_id: Uuid, status: ChannelStatus) -> bool {
        {
            let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
            if statuses.get(&channel_id) == Some(&status) {
                return false;
            }
            statuses.insert(channel_id, status);
            // Queue under the lock so concurrent setters reach the store in
            // the same order they updated the map
            let _ = self.writer.send(StatusOp::Write(channel_id, status));
        }

        debug!("Channel {} status -> {}", channel_id, status);
        self.state.broadcast_event(PlayoutEvent::ChannelStatusChanged {
            channel_id,
            status,
            timestamp: Utc::now(),
        });
        true
    }

    pub fn get_status(&self, channel_id: Uuid) -> Option<ChannelStatus> {
        self.statuses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel_id)
            .copied()
    }

    /// Wait until every write queued so far has been attempted
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writer.send(StatusOp::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}
