//! Progress poller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the progress poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// How often to query job status (milliseconds).
    /// The first query is issued one interval after polling starts.
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Consecutive failed status queries tolerated before the job is
    /// declared failed. A successful query resets the count.
    #[serde(default = "default_max_faults")]
    pub max_consecutive_faults: u32,

    /// Fail the job when the reported percent has not changed for this
    /// many seconds (0 = never).
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,
}

fn default_interval() -> u64 {
    1000 // 1 second
}

fn default_max_faults() -> u32 {
    3
}

fn default_stall_timeout() -> u64 {
    600 // 10 minutes
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        (self.stall_timeout_secs > 0).then(|| Duration::from_secs(self.stall_timeout_secs))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            max_consecutive_faults: default_max_faults(),
            stall_timeout_secs: default_stall_timeout(),
        }
    }
}
