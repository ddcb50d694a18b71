//! Ingestion progress estimation and publication
//!
//! The downloader is the sole writer of progress; arbitrary readers (the
//! availability gate, diagnostics) poll the latest snapshot without any
//! synchronization with the writer. Snapshots are immutable values swapped
//! through a `tokio::sync::watch` channel, so a reader never observes a
//! torn value and may lag by at most one batch.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

/// Estimate published before the first batch completes: effectively
/// infinite, so consumers treat "not yet measured" as "not ready".
pub const INITIAL_ESTIMATE: Duration = Duration::MAX;

/// Lifecycle state of the ingestion task
///
/// Terminal states are explicitly observable so consumers can distinguish
/// "still working", "done", and "permanently stalled".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// An immutable progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub state: IngestState,
    /// Estimated time until all wanted tenders are loaded
    pub remaining: Duration,
}

impl ProgressSnapshot {
    pub fn initial() -> Self {
        Self {
            state: IngestState::Idle,
            remaining: INITIAL_ESTIMATE,
        }
    }

    /// True once the estimate has reached zero
    pub fn ready(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// Read side of the progress channel; cheap to clone, lock-free to read
pub type ProgressReceiver = watch::Receiver<ProgressSnapshot>;

/// Write side of the progress channel, held by the downloader
#[derive(Debug)]
pub struct ProgressPublisher {
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressPublisher {
    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: ProgressSnapshot) {
        self.tx.send_replace(snapshot);
    }

    /// Move to a new state, keeping the last published estimate.
    pub fn publish_state(&self, state: IngestState) {
        self.tx.send_modify(|snapshot| snapshot.state = state);
    }
}

/// Create a progress channel primed with the initial snapshot.
pub fn progress_channel() -> (ProgressPublisher, ProgressReceiver) {
    let (tx, rx) = watch::channel(ProgressSnapshot::initial());
    (ProgressPublisher { tx }, rx)
}

/// Running-average remaining-time estimator
///
/// Coarse by design: it gates availability, not correctness. The estimate
/// is recomputed after every merged batch from the elapsed time of this
/// run and the number of records it has loaded.
#[derive(Debug)]
pub struct ProgressEstimator {
    started_at: Instant,
    target: u64,
    already_loaded: u64,
}

impl ProgressEstimator {
    /// Start the clock. `already_loaded` is the store's record count at
    /// the beginning of the run; `target` the total wanted.
    pub fn new(target: u64, already_loaded: u64) -> Self {
        Self {
            started_at: Instant::now(),
            target,
            already_loaded,
        }
    }

    /// Estimated remaining time after `loaded_this_run` records.
    pub fn remaining(&self, loaded_this_run: u64) -> Duration {
        self.remaining_at(self.started_at.elapsed(), loaded_this_run)
    }

    fn remaining_at(&self, elapsed: Duration, loaded_this_run: u64) -> Duration {
        let outstanding = self
            .target
            .saturating_sub(self.already_loaded + loaded_this_run);
        if outstanding == 0 {
            return Duration::ZERO;
        }

        let per_item = elapsed.as_secs_f64() / loaded_this_run.max(1) as f64;
        Duration::from_secs_f64(per_item * outstanding as f64)
    }
}
