//! Job API handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use reelgrab_core::{CoordinatorError, JobRequest, JobSnapshot, QualityOption};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job
#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    /// Media page URL
    #[serde(default)]
    pub url: String,
    /// Quality wire name ("best", "high", "medium", "low", "audio"). Defaults to best.
    pub quality: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

type JobError = (StatusCode, Json<JobErrorResponse>);

fn job_error(status: StatusCode, error: impl Into<String>) -> JobError {
    (
        status,
        Json(JobErrorResponse {
            error: error.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Current job snapshot
pub async fn get_job(State(state): State<Arc<AppState>>) -> Json<JobSnapshot> {
    Json(state.coordinator().snapshot())
}

/// Submit a new job
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitJobBody>, JsonRejection>,
) -> Result<(StatusCode, Json<JobSnapshot>), JobError> {
    let Json(body) = payload.map_err(|e| job_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let quality = match body.quality.as_deref() {
        Some(raw) => raw
            .parse::<QualityOption>()
            .map_err(|e| job_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => QualityOption::default(),
    };

    let request = JobRequest::new(body.url, quality);

    match state.coordinator().submit(request).await {
        Ok(job_id) => {
            info!("Accepted job {}", job_id);
            Ok((StatusCode::ACCEPTED, Json(state.coordinator().snapshot())))
        }
        Err(e @ CoordinatorError::InvalidRequest(_)) => {
            Err(job_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ (CoordinatorError::Busy { .. } | CoordinatorError::Cancelled)) => {
            Err(job_error(StatusCode::CONFLICT, e.to_string()))
        }
        Err(e @ CoordinatorError::Submission(_)) => {
            Err(job_error(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// Reset to idle, abandoning any job in flight
pub async fn reset_job(State(state): State<Arc<AppState>>) -> Json<JobSnapshot> {
    Json(state.coordinator().reset().await)
}

/// Redirect to the finished artifact
pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, JobError> {
    let snapshot = state.coordinator().snapshot();
    match snapshot.artifact {
        Some(artifact) => Ok(Redirect::to(&artifact.url)),
        None => Err(job_error(
            StatusCode::CONFLICT,
            format!("No artifact available: job is {}", snapshot.state),
        )),
    }
}
