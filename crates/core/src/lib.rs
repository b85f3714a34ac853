pub mod backend;
pub mod config;
pub mod coordinator;
pub mod job;
pub mod metrics;
pub mod poller;
pub mod submitter;
pub mod testing;

pub use backend::{BackendConfig, BackendError, ConversionBackend, HttpBackend, ProgressReport};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig,
};
pub use coordinator::{CoordinatorConfig, CoordinatorError, JobCoordinator};
pub use job::{
    ArtifactRef, JobFailure, JobId, JobRequest, JobSnapshot, JobState, QualityOption,
    RequestError,
};
pub use poller::{PollEvent, PollHandle, PollerConfig, ProgressPoller};
pub use submitter::{JobSubmitter, SubmissionError};
