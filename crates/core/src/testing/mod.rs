//! Testing utilities and mock implementations.
//!
//! This module provides a mock conversion backend so the submitter, poller
//! and coordinator can be exercised without a real service.
//!
//! # Example
//!
//! ```rust,ignore
//! use reelgrab_core::testing::{fixtures, MockBackend};
//!
//! let backend = MockBackend::new();
//! backend.push_job_id("42").await;
//! backend.script_progress("42", &[0, 25, 60, 100]).await;
//!
//! let coordinator = fixtures::fast_coordinator(Arc::new(backend.clone()));
//! ```

mod mock_backend;

pub use mock_backend::MockBackend;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::backend::ConversionBackend;
    use crate::coordinator::{CoordinatorConfig, JobCoordinator};
    use crate::job::{JobRequest, QualityOption};
    use crate::poller::PollerConfig;

    /// A valid request with the given quality.
    pub fn request(quality: QualityOption) -> JobRequest {
        JobRequest::new("https://youtu.be/abc", quality)
    }

    /// Poller settings with short timings for tests.
    pub fn fast_poller_config() -> PollerConfig {
        PollerConfig {
            interval_ms: 10,
            max_consecutive_faults: 3,
            stall_timeout_secs: 0,
        }
    }

    /// Coordinator settings with a short grace delay for tests.
    pub fn fast_coordinator_config() -> CoordinatorConfig {
        CoordinatorConfig {
            artifact_grace_ms: 10,
        }
    }

    /// A coordinator over `backend` using the fast test timings.
    pub fn fast_coordinator(backend: Arc<dyn ConversionBackend>) -> JobCoordinator {
        JobCoordinator::new(backend, fast_poller_config(), fast_coordinator_config())
    }
}
