// Which snapshot the dashboard shows, and when it picks up a newer one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::DashboardState;
use crate::models::Snapshot;
use crate::worker::SnapshotReceiver;

/// Holds the snapshot on screen. Paused freezes it while the sampler keeps
/// publishing; resuming fetches at once, otherwise one fetch per refresh period.
pub struct Viewer {
    shown: Arc<Snapshot>,
    last_fetch: Instant,
    paused: bool,
}

impl Viewer {
    pub fn new(snapshots: &SnapshotReceiver, now: Instant) -> Self {
        Self {
            shown: snapshots.borrow().clone(),
            last_fetch: now,
            paused: false,
        }
    }

    pub fn shown(&self) -> &Arc<Snapshot> {
        &self.shown
    }

    /// Swaps in the latest snapshot when due. Returns true if it fetched.
    pub fn maybe_fetch(
        &mut self,
        state: &DashboardState,
        snapshots: &SnapshotReceiver,
        now: Instant,
    ) -> bool {
        if state.paused {
            self.paused = true;
            return false;
        }
        let resumed = std::mem::take(&mut self.paused);
        let due = now.saturating_duration_since(self.last_fetch)
            >= Duration::from_secs(state.refresh_rate);
        if !(resumed || due) {
            return false;
        }
        self.shown = snapshots.borrow().clone();
        self.last_fetch = now;
        true
    }
}
