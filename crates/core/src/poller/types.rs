//! Events emitted by the progress poller.

use crate::job::{JobFailure, JobId};

/// Outcome of one status query, tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// The job is still running.
    Progress { job_id: JobId, percent: u8 },
    /// The job finished. Emitted at most once, always last.
    Completed { job_id: JobId },
    /// The job failed. Emitted at most once, always last.
    Failed { job_id: JobId, failure: JobFailure },
}

impl PollEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            PollEvent::Progress { job_id, .. }
            | PollEvent::Completed { job_id }
            | PollEvent::Failed { job_id, .. } => job_id,
        }
    }
}
