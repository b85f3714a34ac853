//! Coordinator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the job lifecycle coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Delay between the backend reporting completion and the artifact
    /// reference being published (milliseconds). Gives the backend time to
    /// finish writing the file.
    #[serde(default = "default_grace")]
    pub artifact_grace_ms: u64,
}

fn default_grace() -> u64 {
    1000 // 1 second
}

impl CoordinatorConfig {
    pub fn artifact_grace(&self) -> Duration {
        Duration::from_millis(self.artifact_grace_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            artifact_grace_ms: default_grace(),
        }
    }
}
