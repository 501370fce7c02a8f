//! Recording progress, observed from the outside.
//!
//! The monitor only watches the engine's recording flag and the wall clock.
//! It never sends anything to the device.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: Duration,
    /// Share of the requested duration, clamped to `0.0..=1.0`
    pub fraction: f64,
}

impl Progress {
    fn new(elapsed: Duration, total: Duration) -> Self {
        let fraction = if total.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        };
        Self { elapsed, fraction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The requested duration elapsed while the device was still recording
    Completed,
    /// Recording stopped before the duration elapsed
    Cancelled,
}

pub struct RecordingMonitor {
    handle: JoinHandle<MonitorOutcome>,
}

impl RecordingMonitor {
    /// Start reporting progress every `poll_interval` until `duration` has
    /// elapsed or the watched flag turns false.
    pub fn spawn(
        recording: watch::Receiver<bool>,
        duration: Duration,
        poll_interval: Duration,
        progress: mpsc::Sender<Progress>,
    ) -> Self {
        let handle = tokio::spawn(run(recording, duration, poll_interval, progress));
        Self { handle }
    }

    /// Outcome of the run. An aborted or panicked task counts as cancelled.
    pub async fn wait(self) -> MonitorOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                debug!("Recording monitor aborted");
                MonitorOutcome::Cancelled
            }
            Err(e) => {
                error!("Recording monitor failed: {}", e);
                MonitorOutcome::Cancelled
            }
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

async fn run(
    mut recording: watch::Receiver<bool>,
    duration: Duration,
    poll_interval: Duration,
    progress: mpsc::Sender<Progress>,
) -> MonitorOutcome {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if !*recording.borrow_and_update() {
            info!(elapsed = ?start.elapsed(), "Recording ended early");
            return MonitorOutcome::Cancelled;
        }

        let elapsed = start.elapsed();
        if elapsed >= duration {
            let _ = progress.send(Progress::new(duration, duration)).await;
            info!(?duration, "Recording duration elapsed");
            return MonitorOutcome::Completed;
        }
        // A slow consumer only misses intermediate updates.
        let _ = progress.try_send(Progress::new(elapsed, duration));

        tokio::select! {
            _ = ticker.tick() => {}
            changed = recording.changed() => {
                if changed.is_err() {
                    debug!("Recording state sender dropped");
                    return MonitorOutcome::Cancelled;
                }
            }
        }
    }
}
