//! Playback logger
//!
//! Fire-and-forget journal of terminal transitions. Callers never wait on
//! the store: entries are queued to one writer task that appends them in
//! order, then marks the schedule item completed. A failed write is logged
//! and dropped; the session keeps going.

use onair_common::{PlaybackLogEntry, ScheduleStatus};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::PlayoutStore;

enum JournalOp {
    Append(PlaybackLogEntry),
    ItemStatus(Uuid, ScheduleStatus),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct PlaybackLogger {
    tx: mpsc::UnboundedSender<JournalOp>,
}

impl PlaybackLogger {
    /// Create the logger and spawn its writer task (requires a runtime)
    pub fn new(store: Arc<dyn PlayoutStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<JournalOp>();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    JournalOp::Append(entry) => {
                        if let Err(e) = store.append_playback_log(&entry).await {
                            warn!(
                                "Failed to append playback log for item {}: {}",
                                entry.schedule_item_id, e
                            );
                        }
                        if let Err(e) = store
                            .update_schedule_item_status(entry.schedule_item_id, ScheduleStatus::Completed)
                            .await
                        {
                            warn!(
                                "Failed to mark item {} completed: {}",
                                entry.schedule_item_id, e
                            );
                        }
                    }
                    JournalOp::ItemStatus(item_id, status) => {
                        if let Err(e) = store.update_schedule_item_status(item_id, status).await {
                            warn!("Failed to set item {} status {}: {}", item_id, status, e);
                        }
                    }
                    JournalOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Playback log writer stopped");
        });

        Self { tx }
    }

    /// Queue a log entry; the item is marked completed after it is appended
    pub fn log(&self, entry: PlaybackLogEntry) {
        if self.tx.send(JournalOp::Append(entry)).is_err() {
            warn!("Playback log writer gone; entry dropped");
        }
    }

    /// Queue an engine-owned item status change
    pub fn mark_item(&self, item_id: Uuid, status: ScheduleStatus) {
        if self.tx.send(JournalOp::ItemStatus(item_id, status)).is_err() {
            warn!("Playback log writer gone; status for {} dropped", item_id);
        }
    }

    /// Wait until everything queued so far has been attempted
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(JournalOp::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}
