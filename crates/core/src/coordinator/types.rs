//! Types for the job coordinator.

use thiserror::Error;

use crate::backend::BackendError;
use crate::job::{JobState, RequestError};
use crate::submitter::SubmissionError;

/// Errors returned by [`JobCoordinator::submit`](super::JobCoordinator::submit).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The request failed validation. Nothing was sent and the state is
    /// unchanged.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// Another job is still being submitted or processed.
    #[error("a job is already {state}")]
    Busy { state: JobState },

    /// The backend rejected the job or could not be reached. The job is
    /// now `Failed`.
    #[error("submission failed: {0}")]
    Submission(BackendError),

    /// The coordinator was reset while the submission was in flight; the
    /// backend's answer was discarded.
    #[error("submission cancelled by reset")]
    Cancelled,
}

impl From<SubmissionError> for CoordinatorError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::InvalidRequest(e) => Self::InvalidRequest(e),
            SubmissionError::Backend { cause } => Self::Submission(cause),
        }
    }
}
