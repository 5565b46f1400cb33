//! Cancellable session ticker
//!
//! One task per Playing session calls `tick()` once per period. The task
//! captures the session epoch it was started under and exits as soon as the
//! epoch moves on, so a tick already in flight when a command lands can
//! never advance the session a second time. The handle lives next to the
//! session under the same lock, making cancel-and-restart atomic with the
//! command that caused it.

use onair_common::events::SessionStatus;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::engine::{ChannelRuntime, EffectSink};

#[derive(Debug, Default)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort the running task, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Start ticking `runtime` under `epoch`, replacing any previous task
    pub(crate) fn restart(
        &mut self,
        runtime: Weak<ChannelRuntime>,
        sink: EffectSink,
        period: Duration,
        epoch: u64,
    ) {
        self.cancel();
        self.handle = Some(tokio::spawn(run(runtime, sink, period, epoch)));
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(runtime: Weak<ChannelRuntime>, sink: EffectSink, period: Duration, epoch: u64) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(runtime) = runtime.upgrade() else {
            break;
        };
        let mut cell = runtime.lock().await;
        if cell.session.epoch() != epoch {
            debug!("[{}] Stale ticker exiting", runtime.channel_id());
            break;
        }

        cell.session.tick();
        sink.apply(&mut cell.session);

        if cell.session.status() != SessionStatus::Playing {
            debug!(
                "[{}] Ticker stopping: session {}",
                runtime.channel_id(),
                cell.session.status()
            );
            break;
        }
    }
}
