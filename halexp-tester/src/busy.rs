//! Busy/idle indicator
//!
//! `busy` is derived from the current run's outstanding counter. Consumers
//! poll it; a staleness of one poll interval is acceptable for a spinner.

use halexp_common::events::{DispatchEvent, EventBus};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::dispatcher::CurrentRun;

/// Default polling interval for busy watchers
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Read-only view of the dispatcher's current run counter
#[derive(Clone)]
pub struct BusyIndicator {
    current: CurrentRun,
}

impl BusyIndicator {
    pub(crate) fn new(current: CurrentRun) -> Self {
        Self { current }
    }

    /// Outstanding requests of the current run (0 when no run has started)
    pub async fn outstanding(&self) -> usize {
        self.current
            .read()
            .await
            .as_ref()
            .map_or(0, |run| run.outstanding())
    }

    pub async fn is_busy(&self) -> bool {
        self.outstanding().await > 0
    }

    /// Poll until the current run has no outstanding requests
    pub async fn wait_until_idle(&self, poll: Duration) {
        let mut interval = tokio::time::interval(poll);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !self.is_busy().await {
                return;
            }
        }
    }

    /// Spawn a poller emitting `BusyChanged` on every busy/idle transition
    pub fn spawn_watcher(self, poll: Duration, event_bus: EventBus) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = false;
            loop {
                interval.tick().await;
                let busy = self.is_busy().await;
                if busy != last {
                    debug!(busy, "Busy indicator changed");
                    event_bus.emit_lossy(DispatchEvent::BusyChanged {
                        busy,
                        timestamp: chrono::Utc::now(),
                    });
                    last = busy;
                }
            }
        })
    }
}
