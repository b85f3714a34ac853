//! HTTP conversion backend client.
//!
//! Endpoints:
//! - `POST /start-download` with `{url, quality}` returns `{job_id}`
//! - `GET /progress?job_id=<id>` returns `{percent}`
//! - `GET /get-file?job_id=<id>` serves the artifact

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::job::{JobId, JobRequest, QualityOption};

use super::config::BackendConfig;
use super::types::{BackendError, ConversionBackend, ProgressReport};

/// Body of `POST /start-download`.
#[derive(Debug, Serialize)]
struct StartDownloadBody<'a> {
    url: &'a str,
    quality: QualityOption,
}

/// Response of `POST /start-download`. Errors come back as `{error}`.
#[derive(Debug, Deserialize)]
struct StartDownloadResponse {
    #[serde(default)]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Response of `GET /progress`.
#[derive(Debug, Deserialize)]
struct ProgressResponse {
    percent: i64,
}

/// Conversion backend reached over HTTP.
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Create a new HTTP backend client.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| BackendError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn map_send_error(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::ConnectionFailed(e.to_string())
        }
    }

    /// Turn a non-success response into a status error, keeping the
    /// backend's `{error}` message when there is one.
    async fn status_error(response: Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.chars().take(200).collect::<String>());
        BackendError::status(status.as_u16(), message.trim())
    }
}

#[async_trait]
impl ConversionBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn start_job(&self, request: &JobRequest) -> Result<JobId, BackendError> {
        let url = format!("{}/start-download", self.base_url());
        let body = StartDownloadBody {
            url: &request.source_url,
            quality: request.quality,
        };

        debug!(
            "Starting backend job: url='{}', quality={}",
            request.source_url, request.quality
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            let err = Self::status_error(response).await;
            warn!("Backend rejected job: {}", err);
            return Err(err);
        }

        let parsed: StartDownloadResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        match parsed.job_id {
            Some(id) if !id.trim().is_empty() => Ok(JobId::new(id)),
            _ => Err(BackendError::MalformedResponse(
                "response has no job_id".to_string(),
            )),
        }
    }

    async fn job_progress(&self, job_id: &JobId) -> Result<ProgressReport, BackendError> {
        let url = format!(
            "{}/progress?job_id={}",
            self.base_url(),
            urlencoding::encode(job_id.as_str())
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let parsed: ProgressResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        ProgressReport::from_percent(parsed.percent)
    }

    fn artifact_url(&self, job_id: &JobId) -> String {
        format!(
            "{}/get-file?job_id={}",
            self.base_url(),
            urlencoding::encode(job_id.as_str())
        )
    }
}
