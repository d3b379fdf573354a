use std::{fmt, sync::Arc, time::Duration};

use chrono::Utc;
use pm2_integration::ProcessSupervisor;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    error::RefreshCycleError,
    live_view::{LiveView, LiveViewStore},
    render::render_summary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Fetching,
    Rendering,
    Publishing,
}

impl fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Rendering => "rendering",
            Self::Publishing => "publishing",
        })
    }
}

/// Periodically re-renders the live view from a fresh snapshot.
///
/// Cycles run one after another on a single task. Ticks that come due while a
/// cycle is still publishing are skipped, never queued.
pub struct RefreshLoop {
    supervisor: Arc<dyn ProcessSupervisor>,
    store: Arc<LiveViewStore>,
    interval: Duration,
}

impl RefreshLoop {
    pub fn new(
        supervisor: Arc<dyn ProcessSupervisor>,
        store: Arc<LiveViewStore>,
        interval: Duration,
    ) -> Self {
        Self {
            supervisor,
            store,
            interval,
        }
    }

    pub async fn run_cycle(&self) -> Result<LiveView, RefreshCycleError> {
        debug!(phase = %RefreshPhase::Fetching, "refresh cycle");
        let snapshot = pm2_integration::snapshot(&self.supervisor)
            .await
            .map_err(|error| RefreshCycleError::new(RefreshPhase::Fetching, error))?;

        debug!(phase = %RefreshPhase::Rendering, processes = snapshot.len(), "refresh cycle");
        let view = render_summary(&snapshot, Utc::now());

        debug!(phase = %RefreshPhase::Publishing, "refresh cycle");
        self.store
            .publish_or_update(&view)
            .await
            .map_err(|error| RefreshCycleError::new(RefreshPhase::Publishing, error))
    }

    /// Runs for the lifetime of the process. The first cycle starts one
    /// interval from now; the initial render belongs to channel binding.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(view) => debug!(
                    phase = %RefreshPhase::Idle,
                    message_id = %view.handle,
                    "live view refreshed"
                ),
                Err(error) => warn!(phase = %error.phase, %error, "refresh cycle aborted"),
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
#[path = "tests/refresh_tests.rs"]
mod tests;
