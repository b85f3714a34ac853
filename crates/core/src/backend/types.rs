//! Types for the conversion backend seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::{JobId, JobRequest};

/// Errors that can occur talking to the conversion backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A progress value outside the documented range.
    #[error("Unexpected progress value: {0}")]
    UnexpectedPercent(i64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Creates a new status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure is likely to go away on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Timeout | Self::UnexpectedPercent(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedResponse(_) | Self::Internal(_) => false,
        }
    }
}

/// Decoded status of a job as reported by the backend.
///
/// The backend encodes failure as `-1` inside the percent field; that
/// sentinel never leaves this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "percent", rename_all = "snake_case")]
pub enum ProgressReport {
    /// Still working, with a percentage in `0..=99`.
    Running(u8),
    /// Finished; the artifact is (about to be) available.
    Complete,
    /// The backend gave up on the job.
    Failed,
}

impl ProgressReport {
    /// Decode a raw wire percentage.
    ///
    /// `-1` is failure, `100` and above is completion, `0..=99` is progress.
    /// Anything below `-1` is rejected.
    pub fn from_percent(raw: i64) -> Result<Self, BackendError> {
        match raw {
            -1 => Ok(Self::Failed),
            p if p >= 100 => Ok(Self::Complete),
            p @ 0..=99 => Ok(Self::Running(p as u8)),
            other => Err(BackendError::UnexpectedPercent(other)),
        }
    }
}

/// The conversion backend the coordinator drives.
///
/// Implementations are expected to be cheap to share behind an `Arc`.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Create a new conversion job. Every call may create a new job.
    async fn start_job(&self, request: &JobRequest) -> Result<JobId, BackendError>;

    /// Query the status of a job.
    async fn job_progress(&self, job_id: &JobId) -> Result<ProgressReport, BackendError>;

    /// URL the finished artifact can be fetched from.
    fn artifact_url(&self, job_id: &JobId) -> String;
}
