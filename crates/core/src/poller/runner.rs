//! Progress poller implementation.
//!
//! Each started job gets one spawned task that ticks on a fixed interval,
//! queries the backend, and forwards decoded events over a channel. The
//! task stops after the first terminal event or when its handle is
//! cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ConversionBackend, ProgressReport};
use crate::job::{JobFailure, JobId};
use crate::metrics::POLL_QUERIES;

use super::config::PollerConfig;
use super::types::PollEvent;

/// Buffer size for the event channel of one job.
const EVENT_BUFFER: usize = 16;

/// What to do with the result of one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollStep {
    /// Forward the event and keep polling.
    Emit(PollEvent),
    /// Nothing to report (tolerated fault).
    Skip,
    /// Forward the event and stop.
    Finish(PollEvent),
}

/// Per-job bookkeeping for fault counting and stall detection.
#[derive(Debug)]
pub(crate) struct PollTracker {
    job_id: JobId,
    max_faults: u32,
    stall_timeout: Option<Duration>,
    consecutive_faults: u32,
    last_percent: Option<u8>,
    last_change: Instant,
}

impl PollTracker {
    pub(crate) fn new(job_id: JobId, config: &PollerConfig, started: Instant) -> Self {
        Self {
            job_id,
            max_faults: config.max_consecutive_faults.max(1),
            stall_timeout: config.stall_timeout(),
            consecutive_faults: 0,
            last_percent: None,
            last_change: started,
        }
    }

    /// Classify one query result.
    pub(crate) fn observe(
        &mut self,
        result: Result<ProgressReport, BackendError>,
        now: Instant,
    ) -> PollStep {
        let job_id = self.job_id.clone();

        let report = match result {
            Ok(report) => {
                self.consecutive_faults = 0;
                report
            }
            Err(e) => {
                self.consecutive_faults += 1;
                if self.consecutive_faults >= self.max_faults {
                    warn!(
                        "Giving up on job {} after {} failed status queries: {}",
                        job_id, self.consecutive_faults, e
                    );
                    return PollStep::Finish(PollEvent::Failed {
                        job_id,
                        failure: JobFailure::PollFaults {
                            attempts: self.consecutive_faults,
                            last_error: e.to_string(),
                        },
                    });
                }
                if e.is_transient() {
                    debug!(
                        "Status query for job {} failed ({}/{}): {}",
                        job_id, self.consecutive_faults, self.max_faults, e
                    );
                } else {
                    warn!(
                        "Status query for job {} was rejected ({}/{}): {}",
                        job_id, self.consecutive_faults, self.max_faults, e
                    );
                }
                return PollStep::Skip;
            }
        };

        match report {
            ProgressReport::Running(percent) => {
                if self.last_percent != Some(percent) {
                    self.last_percent = Some(percent);
                    self.last_change = now;
                } else if let Some(limit) = self.stall_timeout {
                    if now.duration_since(self.last_change) >= limit {
                        warn!("Job {} stalled at {}%", job_id, percent);
                        return PollStep::Finish(PollEvent::Failed {
                            job_id,
                            failure: JobFailure::Stalled {
                                stalled_secs: limit.as_secs(),
                            },
                        });
                    }
                }
                PollStep::Emit(PollEvent::Progress { job_id, percent })
            }
            ProgressReport::Complete => PollStep::Finish(PollEvent::Completed { job_id }),
            ProgressReport::Failed => PollStep::Finish(PollEvent::Failed {
                job_id,
                failure: JobFailure::Reported,
            }),
        }
    }
}

/// Handle to one job's polling task.
///
/// Cancelling (or dropping) the handle stops the task; a query that is in
/// flight at that moment is dropped and its result is never delivered.
#[derive(Debug)]
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stop polling. Idempotent.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!("Cancelling poller for job {}", self.job_id);
        }
        self.cancel.cancel();
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Starts per-job polling tasks against a backend.
#[derive(Clone)]
pub struct ProgressPoller {
    backend: Arc<dyn ConversionBackend>,
    config: PollerConfig,
}

impl ProgressPoller {
    pub fn new(backend: Arc<dyn ConversionBackend>, config: PollerConfig) -> Self {
        Self { backend, config }
    }

    /// Start polling `job_id`. Must be called from within a tokio runtime.
    ///
    /// Events arrive on the returned receiver in the order their queries
    /// were issued. The channel closes when polling stops.
    pub fn start(&self, job_id: JobId) -> (PollHandle, mpsc::Receiver<PollEvent>) {
        self.start_under(job_id, &CancellationToken::new())
    }

    /// Like [`start`](Self::start), but polling also stops when `parent`
    /// is cancelled.
    pub fn start_under(
        &self,
        job_id: JobId,
        parent: &CancellationToken,
    ) -> (PollHandle, mpsc::Receiver<PollEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = parent.child_token();

        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.backend),
            job_id.clone(),
            self.config.clone(),
            cancel.clone(),
            tx,
        ));

        info!(
            "Polling job {} every {}ms",
            job_id, self.config.interval_ms
        );

        (PollHandle { job_id, cancel, task }, rx)
    }
}

async fn poll_loop(
    backend: Arc<dyn ConversionBackend>,
    job_id: JobId,
    config: PollerConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<PollEvent>,
) {
    let period = config.interval().max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tracker = PollTracker::new(job_id.clone(), &config, Instant::now());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = backend.job_progress(&job_id) => result,
        };

        // A response that lost the race with cancellation is discarded.
        if cancel.is_cancelled() {
            break;
        }

        let outcome = match &result {
            Ok(ProgressReport::Running(_)) => "progress",
            Ok(ProgressReport::Complete) => "complete",
            Ok(ProgressReport::Failed) => "failed",
            Err(_) => "fault",
        };
        POLL_QUERIES.with_label_values(&[outcome]).inc();

        let (event, last) = match tracker.observe(result, Instant::now()) {
            PollStep::Skip => continue,
            PollStep::Emit(event) => (event, false),
            PollStep::Finish(event) => (event, true),
        };

        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = tx.send(event) => sent.is_ok(),
        };

        if !delivered || last {
            break;
        }
    }

    debug!("Poller for job {} stopped", job_id);
}
