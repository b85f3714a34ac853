//! Mock conversion backend for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{BackendError, ConversionBackend, ProgressReport};
use crate::job::{JobId, JobRequest};

/// One scripted answer to a status query.
#[derive(Debug, Clone)]
enum ScriptedProgress {
    /// Raw wire percentage, decoded like the real backend's.
    Percent(i64),
    Error(BackendError),
}

/// Mock implementation of the ConversionBackend trait.
///
/// Provides controllable behavior for testing:
/// - Scripted job ids and progress sequences per job
/// - Injected submission and polling failures
/// - Artificial latency to keep requests in flight
/// - Recorded calls for assertions
///
/// Progress scripts are consumed one entry per query; the last entry
/// repeats once the script is exhausted. Jobs without a script report 0%,
/// like the real backend does for ids it does not know.
///
/// # Example
///
/// ```rust,ignore
/// let backend = MockBackend::new();
/// backend.push_job_id("42").await;
/// backend.script_progress("42", &[0, 25, 60, 100]).await;
///
/// let job_id = backend.start_job(&request).await?;
/// assert_eq!(backend.progress_queries("42").await, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    /// Recorded start_job calls.
    started: Arc<RwLock<Vec<JobRequest>>>,
    /// Job ids to hand out, in order.
    job_ids: Arc<RwLock<VecDeque<String>>>,
    /// Counter for generating ids once `job_ids` is empty.
    id_counter: Arc<RwLock<u32>>,
    /// If set, the next start_job call fails with this error.
    next_start_error: Arc<RwLock<Option<BackendError>>>,
    /// Scripted progress per job id.
    progress: Arc<RwLock<HashMap<String, VecDeque<ScriptedProgress>>>>,
    /// Status queries issued per job id.
    queries: Arc<RwLock<HashMap<String, usize>>>,
    start_delay: Arc<RwLock<Duration>>,
    progress_delay: Arc<RwLock<Duration>>,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job id for the next successful start_job call.
    pub async fn push_job_id(&self, job_id: impl Into<String>) {
        self.job_ids.write().await.push_back(job_id.into());
    }

    /// Configure the next start_job call to fail with the given error.
    pub async fn set_next_start_error(&self, error: BackendError) {
        *self.next_start_error.write().await = Some(error);
    }

    /// Delay every start_job call.
    pub async fn set_start_delay(&self, delay: Duration) {
        *self.start_delay.write().await = delay;
    }

    /// Delay every job_progress call.
    pub async fn set_progress_delay(&self, delay: Duration) {
        *self.progress_delay.write().await = delay;
    }

    /// Replace the progress script for a job with raw wire percentages.
    pub async fn script_progress(&self, job_id: &str, percents: &[i64]) {
        let script = percents
            .iter()
            .map(|p| ScriptedProgress::Percent(*p))
            .collect();
        self.progress
            .write()
            .await
            .insert(job_id.to_string(), script);
    }

    /// Append a raw wire percentage to a job's script.
    pub async fn push_progress(&self, job_id: &str, percent: i64) {
        self.progress
            .write()
            .await
            .entry(job_id.to_string())
            .or_default()
            .push_back(ScriptedProgress::Percent(percent));
    }

    /// Append a failing query to a job's script.
    pub async fn push_progress_error(&self, job_id: &str, error: BackendError) {
        self.progress
            .write()
            .await
            .entry(job_id.to_string())
            .or_default()
            .push_back(ScriptedProgress::Error(error));
    }

    /// Get all recorded start_job requests.
    pub async fn start_requests(&self) -> Vec<JobRequest> {
        self.started.read().await.clone()
    }

    /// Number of status queries issued for a job.
    pub async fn progress_queries(&self, job_id: &str) -> usize {
        self.queries.read().await.get(job_id).copied().unwrap_or(0)
    }

    /// Number of status queries issued across all jobs.
    pub async fn total_progress_queries(&self) -> usize {
        self.queries.read().await.values().sum()
    }

    async fn next_job_id(&self) -> String {
        if let Some(id) = self.job_ids.write().await.pop_front() {
            return id;
        }
        let mut counter = self.id_counter.write().await;
        *counter += 1;
        format!("mock-job-{}", *counter)
    }

    async fn next_progress(&self, job_id: &str) -> ScriptedProgress {
        let mut scripts = self.progress.write().await;
        match scripts.get_mut(job_id) {
            Some(script) if script.len() > 1 => script
                .pop_front()
                .unwrap_or(ScriptedProgress::Percent(0)),
            Some(script) => script
                .front()
                .cloned()
                .unwrap_or(ScriptedProgress::Percent(0)),
            None => ScriptedProgress::Percent(0),
        }
    }
}

#[async_trait]
impl ConversionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start_job(&self, request: &JobRequest) -> Result<JobId, BackendError> {
        self.started.write().await.push(request.clone());

        let delay = *self.start_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_start_error.write().await.take() {
            return Err(err);
        }

        Ok(JobId::new(self.next_job_id().await))
    }

    async fn job_progress(&self, job_id: &JobId) -> Result<ProgressReport, BackendError> {
        *self
            .queries
            .write()
            .await
            .entry(job_id.as_str().to_string())
            .or_insert(0) += 1;

        let delay = *self.progress_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.next_progress(job_id.as_str()).await {
            ScriptedProgress::Percent(raw) => ProgressReport::from_percent(raw),
            ScriptedProgress::Error(err) => Err(err),
        }
    }

    fn artifact_url(&self, job_id: &JobId) -> String {
        format!("http://mock-backend/get-file?job_id={}", job_id)
    }
}
