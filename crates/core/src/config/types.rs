use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::backend::BackendConfig;
use crate::coordinator::CoordinatorConfig;
use crate::poller::PollerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (credentials redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub backend: SanitizedBackendConfig,
    pub poller: PollerConfig,
    pub coordinator: CoordinatorConfig,
}

/// Backend config with any userinfo stripped from the URL
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBackendConfig {
    pub url: String,
    pub credentials_configured: bool,
    pub timeout_secs: u32,
    pub user_agent: String,
}

impl From<&BackendConfig> for SanitizedBackendConfig {
    fn from(config: &BackendConfig) -> Self {
        let (url, credentials_configured) = redact_url(&config.url);
        Self {
            url,
            credentials_configured,
            timeout_secs: config.timeout_secs,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Remove `user:password@` from a URL, reporting whether anything was removed.
fn redact_url(raw: &str) -> (String, bool) {
    match reqwest::Url::parse(raw) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            // Both setters only fail for cannot-be-a-base URLs, which carry no userinfo.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            (url.to_string(), true)
        }
        _ => (raw.to_string(), false),
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            backend: SanitizedBackendConfig::from(&config.backend),
            poller: config.poller.clone(),
            coordinator: config.coordinator.clone(),
        }
    }
}
