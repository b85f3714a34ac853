//! Job submission: validates a request and creates the backend job.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ConversionBackend};
use crate::job::{JobId, JobRequest, RequestError};

/// Errors from submitting a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The request failed validation; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// The backend rejected the job or could not be reached.
    #[error("submission failed: {cause}")]
    Backend { cause: BackendError },
}

impl From<BackendError> for SubmissionError {
    fn from(cause: BackendError) -> Self {
        Self::Backend { cause }
    }
}

/// Sends job creation requests to the backend.
///
/// Each call to [`JobSubmitter::submit`] sends at most one request and
/// never retries; every successful call creates a new backend job.
#[derive(Clone)]
pub struct JobSubmitter {
    backend: Arc<dyn ConversionBackend>,
}

impl JobSubmitter {
    pub fn new(backend: Arc<dyn ConversionBackend>) -> Self {
        Self { backend }
    }

    /// Validate `request` and create a backend job for it.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobId, SubmissionError> {
        request.validate()?;

        debug!(
            "Submitting '{}' ({}) to {} backend",
            request.source_url,
            request.quality,
            self.backend.name()
        );

        match self.backend.start_job(request).await {
            Ok(job_id) => {
                info!("Backend accepted job {}", job_id);
                Ok(job_id)
            }
            Err(e) => {
                warn!("Job submission failed: {}", e);
                Err(e.into())
            }
        }
    }
}
