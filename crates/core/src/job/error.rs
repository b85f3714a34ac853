//! Error types for job requests.

use thiserror::Error;

/// Reasons a job request is rejected before it reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The source URL is empty or whitespace.
    #[error("source URL is empty")]
    EmptyUrl,

    /// The source URL could not be parsed.
    #[error("invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The source URL uses a scheme the backend cannot fetch.
    #[error("unsupported URL scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The source URL has no host component.
    #[error("source URL has no host: {url}")]
    MissingHost { url: String },

    /// The quality option is not one of the recognized values.
    #[error("unknown quality option: {0}")]
    UnknownQuality(String),
}

impl RequestError {
    /// Creates a new invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
