use std::sync::Arc;
use reelgrab_core::{Config, JobCoordinator, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    coordinator: Arc<JobCoordinator>,
}

impl AppState {
    pub fn new(config: Config, coordinator: Arc<JobCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn coordinator(&self) -> &JobCoordinator {
        self.coordinator.as_ref()
    }
}
