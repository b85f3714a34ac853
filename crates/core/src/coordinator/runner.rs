//! Job lifecycle coordinator implementation.
//!
//! Owns the single active job and drives it through
//! `Idle -> Submitting -> InProgress -> Ready | Failed`, with `reset()`
//! returning to `Idle` from anywhere.
//!
//! Every submit and reset bumps a generation counter. Poll events are
//! applied only when both their job id and the generation of the task
//! that forwarded them match the current job, so late answers for an old
//! job can never touch a newer one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ConversionBackend;
use crate::config::Config;
use crate::job::{ArtifactRef, JobFailure, JobId, JobRequest, JobSnapshot, JobState};
use crate::metrics::{JOBS_CANCELLED, JOBS_COMPLETED, JOBS_FAILED, JOBS_SUBMITTED, JOB_DURATION};
use crate::poller::{PollEvent, PollHandle, PollerConfig, ProgressPoller};
use crate::submitter::JobSubmitter;

use super::config::CoordinatorConfig;
use super::types::CoordinatorError;

/// Mutable coordinator state, guarded by [`Shared::inner`].
struct Inner {
    snapshot: JobSnapshot,
    generation: u64,
    started_at: Option<Instant>,
    poll: Option<PollHandle>,
    driver: Option<JoinHandle<()>>,
}

impl Inner {
    fn owns(&self, generation: u64, job_id: &JobId) -> bool {
        self.generation == generation && self.snapshot.job_id.as_ref() == Some(job_id)
    }

    /// Cancel the poller and any pending event/grace task.
    fn stop_tasks(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    fn observe_duration(&self, result: &str) {
        if let Some(started) = self.started_at {
            JOB_DURATION
                .with_label_values(&[result])
                .observe(started.elapsed().as_secs_f64());
        }
    }

    fn fail(&mut self, failure: JobFailure) {
        JOBS_FAILED.with_label_values(&[failure.label()]).inc();
        self.observe_duration("failed");
        self.snapshot.state = JobState::Failed;
        self.snapshot.error = Some(failure);
    }
}

struct Shared {
    inner: Mutex<Inner>,
    updates: watch::Sender<JobSnapshot>,
}

impl Shared {
    fn publish(&self, inner: &mut Inner) {
        inner.snapshot.updated_at = Utc::now();
        self.updates.send_replace(inner.snapshot.clone());
    }
}

/// The job lifecycle coordinator.
///
/// At most one job is in flight per coordinator. Presentation code reads
/// state through [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe)
/// and drives it with [`submit`](Self::submit) and [`reset`](Self::reset).
pub struct JobCoordinator {
    backend: Arc<dyn ConversionBackend>,
    submitter: JobSubmitter,
    poller: ProgressPoller,
    config: CoordinatorConfig,
    shared: Arc<Shared>,
    /// Cancelled on drop; parents every poller and driver task.
    shutdown: CancellationToken,
}

impl JobCoordinator {
    /// Create a new coordinator in the `Idle` state.
    pub fn new(
        backend: Arc<dyn ConversionBackend>,
        poller_config: PollerConfig,
        config: CoordinatorConfig,
    ) -> Self {
        let (updates, _) = watch::channel(JobSnapshot::idle());

        Self {
            submitter: JobSubmitter::new(Arc::clone(&backend)),
            poller: ProgressPoller::new(Arc::clone(&backend), poller_config),
            backend,
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    snapshot: JobSnapshot::idle(),
                    generation: 0,
                    started_at: None,
                    poll: None,
                    driver: None,
                }),
                updates,
            }),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a coordinator using the `[poller]` and `[coordinator]` sections.
    pub fn from_config(backend: Arc<dyn ConversionBackend>, config: &Config) -> Self {
        Self::new(backend, config.poller.clone(), config.coordinator.clone())
    }

    /// Current state.
    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.updates.borrow().clone()
    }

    /// Receive every published state change.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until the published state satisfies `predicate`.
    pub async fn wait_until<F>(&self, mut predicate: F) -> JobSnapshot
    where
        F: FnMut(&JobSnapshot) -> bool,
    {
        let mut rx = self.shared.updates.subscribe();
        let snapshot = match rx.wait_for(|snapshot| predicate(snapshot)).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives as long as `self`.
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Submit a new job.
    ///
    /// Invalid requests are rejected before any state change. While a job is
    /// `Submitting` or `InProgress` the call is rejected with `Busy`. Returns
    /// once the backend has assigned an id and polling has started.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, CoordinatorError> {
        if let Err(e) = request.validate() {
            warn!("Rejected job request: {}", e);
            return Err(e.into());
        }

        let generation = {
            let mut inner = self.shared.inner.lock().await;
            let state = inner.snapshot.state;
            if !state.accepts_submission() {
                debug!("Submission rejected, job is {}", state);
                return Err(CoordinatorError::Busy { state });
            }

            inner.stop_tasks();
            inner.generation += 1;
            inner.started_at = Some(Instant::now());
            inner.snapshot = JobSnapshot {
                state: JobState::Submitting,
                request: Some(request.clone()),
                ..JobSnapshot::idle()
            };
            self.shared.publish(&mut inner);
            inner.generation
        };

        JOBS_SUBMITTED.inc();
        let result = self.submitter.submit(&request).await;

        let mut inner = self.shared.inner.lock().await;
        if inner.generation != generation {
            info!("Discarding submission result, coordinator was reset");
            return Err(CoordinatorError::Cancelled);
        }

        match result {
            Ok(job_id) => {
                let (poll, events) = self.poller.start_under(job_id.clone(), &self.shutdown);
                let artifact = ArtifactRef {
                    job_id: job_id.clone(),
                    url: self.backend.artifact_url(&job_id),
                };
                let driver = tokio::spawn(drive_job(
                    Arc::clone(&self.shared),
                    generation,
                    events,
                    artifact,
                    self.config.artifact_grace(),
                    self.shutdown.child_token(),
                ));

                inner.poll = Some(poll);
                inner.driver = Some(driver);
                inner.snapshot.state = JobState::InProgress;
                inner.snapshot.percent = 0;
                inner.snapshot.job_id = Some(job_id.clone());
                self.shared.publish(&mut inner);

                info!("Job {} in progress", job_id);
                Ok(job_id)
            }
            Err(e) => {
                let err = CoordinatorError::from(e);
                let message = match &err {
                    CoordinatorError::Submission(cause) => cause.to_string(),
                    other => other.to_string(),
                };
                inner.fail(JobFailure::Submission { message });
                self.shared.publish(&mut inner);
                Err(err)
            }
        }
    }

    /// Return to `Idle`, cancelling any polling and pending artifact delay.
    ///
    /// Always accepted; calling it repeatedly is harmless.
    pub async fn reset(&self) -> JobSnapshot {
        let mut inner = self.shared.inner.lock().await;

        let previous = inner.snapshot.state;
        if matches!(previous, JobState::Submitting | JobState::InProgress) {
            info!(
                "Reset abandons job {} while {}",
                inner.snapshot.job_id_str(),
                previous
            );
            JOBS_CANCELLED.inc();
        }

        inner.stop_tasks();
        inner.generation += 1;
        inner.started_at = None;

        if !inner.snapshot.is_cleared() {
            inner.snapshot = JobSnapshot::idle();
            self.shared.publish(&mut inner);
        }

        inner.snapshot.clone()
    }
}

impl Drop for JobCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            inner.stop_tasks();
        }
    }
}

/// Apply poll events for one job until it terminates or goes stale.
async fn drive_job(
    shared: Arc<Shared>,
    generation: u64,
    mut events: mpsc::Receiver<PollEvent>,
    artifact: ArtifactRef,
    grace: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            event = events.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };

        let mut inner = shared.inner.lock().await;
        if !inner.owns(generation, event.job_id()) || inner.snapshot.state != JobState::InProgress
        {
            debug!("Discarding stale event for job {}", event.job_id());
            return;
        }

        match event {
            PollEvent::Progress { job_id, percent } => {
                let current = inner.snapshot.percent;
                if percent < current {
                    debug!(
                        "Job {} reported {}% after {}%, keeping {}%",
                        job_id, percent, current, current
                    );
                } else if percent > current {
                    inner.snapshot.percent = percent;
                    shared.publish(&mut inner);
                }
            }
            PollEvent::Completed { job_id } => {
                inner.poll = None;
                inner.snapshot.state = JobState::Ready;
                inner.snapshot.percent = 100;
                JOBS_COMPLETED.inc();
                inner.observe_duration("ready");
                shared.publish(&mut inner);
                info!("Job {} is ready", job_id);
                drop(inner);

                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(grace) => {}
                }

                let mut inner = shared.inner.lock().await;
                if inner.owns(generation, &job_id) && inner.snapshot.state == JobState::Ready {
                    debug!("Artifact for job {} at {}", job_id, artifact.url);
                    inner.snapshot.artifact = Some(artifact);
                    inner.driver = None;
                    shared.publish(&mut inner);
                }
                return;
            }
            PollEvent::Failed { job_id, failure } => {
                warn!("Job {} failed: {}", job_id, failure);
                inner.poll = None;
                inner.driver = None;
                inner.fail(failure);
                shared.publish(&mut inner);
                return;
            }
        }
    }
}
