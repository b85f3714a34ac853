//! Core job types: requests, identifiers, lifecycle states and snapshots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::RequestError;

/// Target fidelity/format of the converted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityOption {
    /// Best available video and audio.
    #[default]
    Best,
    /// Up to 720p.
    High,
    /// Up to 480p.
    Medium,
    /// Up to 360p.
    Low,
    /// Audio track only.
    #[serde(rename = "audio", alias = "audio_only")]
    AudioOnly,
}

impl QualityOption {
    /// Returns the wire value sent to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityOption::Best => "best",
            QualityOption::High => "high",
            QualityOption::Medium => "medium",
            QualityOption::Low => "low",
            QualityOption::AudioOnly => "audio",
        }
    }
}

impl fmt::Display for QualityOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityOption {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" => Ok(QualityOption::Best),
            "high" => Ok(QualityOption::High),
            "medium" => Ok(QualityOption::Medium),
            "low" => Ok(QualityOption::Low),
            "audio" | "audio_only" | "audioonly" => Ok(QualityOption::AudioOnly),
            other => Err(RequestError::UnknownQuality(other.to_string())),
        }
    }
}

/// A conversion request, submitted once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// URL of the media to convert.
    pub source_url: String,
    /// Requested output quality.
    #[serde(default)]
    pub quality: QualityOption,
}

impl JobRequest {
    /// Create a new request. Surrounding whitespace in the URL is dropped.
    pub fn new(source_url: impl Into<String>, quality: QualityOption) -> Self {
        Self {
            source_url: source_url.into().trim().to_string(),
            quality,
        }
    }

    /// Check that the source URL is a plausible media URL.
    ///
    /// The URL must be absolute, use `http` or `https`, and name a host.
    pub fn validate(&self) -> Result<(), RequestError> {
        let raw = self.source_url.trim();
        if raw.is_empty() {
            return Err(RequestError::EmptyUrl);
        }

        let url = Url::parse(raw).map_err(|e| RequestError::invalid_url(raw, e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(RequestError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                })
            }
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(RequestError::MissingHost {
                url: raw.to_string(),
            });
        }

        Ok(())
    }
}

/// Opaque job identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of the coordinator's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No job.
    #[default]
    Idle,
    /// Creation request in flight.
    Submitting,
    /// Backend is processing; progress is being polled.
    InProgress,
    /// Backend finished; artifact can be fetched.
    Ready,
    /// The job failed. See the snapshot's error.
    Failed,
}

impl JobState {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Submitting => "submitting",
            JobState::InProgress => "in_progress",
            JobState::Ready => "ready",
            JobState::Failed => "failed",
        }
    }

    /// Whether a new submission may start from this state.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, JobState::Idle | JobState::Ready | JobState::Failed)
    }

    /// Whether this is a terminal state (until reset).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Ready | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobFailure {
    /// The backend rejected the job or could not be reached at submit time.
    #[error("submission failed: {message}")]
    Submission { message: String },

    /// The backend reported the job as failed.
    #[error("backend reported the job as failed")]
    Reported,

    /// Too many consecutive status queries failed.
    #[error("progress polling failed {attempts} times in a row: {last_error}")]
    PollFaults { attempts: u32, last_error: String },

    /// Progress did not move for too long.
    #[error("no progress for {stalled_secs} seconds")]
    Stalled { stalled_secs: u64 },
}

impl JobFailure {
    /// Short label, used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            JobFailure::Submission { .. } => "submission",
            JobFailure::Reported => "reported",
            JobFailure::PollFaults { .. } => "poll_faults",
            JobFailure::Stalled { .. } => "stalled",
        }
    }
}

/// Where the finished artifact can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub job_id: JobId,
    pub url: String,
}

/// Point-in-time view of the coordinator's job, handed to presentation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub state: JobState,
    /// Progress percentage (0-100).
    pub percent: u8,
    pub job_id: Option<JobId>,
    pub request: Option<JobRequest>,
    /// Set once the job is `Ready` and the finalization grace delay elapsed.
    pub artifact: Option<ArtifactRef>,
    pub error: Option<JobFailure>,
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// The cleared state.
    pub fn idle() -> Self {
        Self {
            state: JobState::Idle,
            percent: 0,
            job_id: None,
            request: None,
            artifact: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether this snapshot is already the cleared state.
    pub fn is_cleared(&self) -> bool {
        self.state == JobState::Idle
            && self.percent == 0
            && self.job_id.is_none()
            && self.request.is_none()
            && self.artifact.is_none()
            && self.error.is_none()
    }

    /// Job id as a string, empty when no job is active.
    pub fn job_id_str(&self) -> &str {
        self.job_id.as_ref().map(JobId::as_str).unwrap_or("")
    }
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
