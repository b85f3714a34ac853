//! Job model shared by the submitter, poller and coordinator.

mod error;
mod types;

pub use error::RequestError;
pub use types::{
    ArtifactRef, JobFailure, JobId, JobRequest, JobSnapshot, JobState, QualityOption,
};
