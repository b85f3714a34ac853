//! Backend client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP conversion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://localhost:5000").
    pub url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    format!("reelgrab/{}", env!("CARGO_PKG_VERSION"))
}

impl BackendConfig {
    /// Config pointing at `url` with default timeout and user agent.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
