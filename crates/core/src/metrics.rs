//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job lifecycle (submissions, completions, failures, durations)
//! - Progress polling (query outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Job Lifecycle Metrics
// =============================================================================

/// Jobs submitted to the backend.
pub static JOBS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("reelgrab_jobs_submitted_total", "Total jobs submitted").unwrap()
});

/// Jobs that reached `Ready`.
pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_jobs_completed_total",
        "Total jobs completed successfully",
    )
    .unwrap()
});

/// Jobs that reached `Failed`, by reason.
pub static JOBS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelgrab_jobs_failed_total", "Total jobs that failed"),
        &["reason"], // "submission", "reported", "poll_faults", "stalled"
    )
    .unwrap()
});

/// Jobs abandoned through reset while still in flight.
pub static JOBS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "reelgrab_jobs_cancelled_total",
        "Total in-flight jobs discarded by reset",
    )
    .unwrap()
});

/// Time from submission to a terminal state.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("reelgrab_job_duration_seconds", "Duration of jobs").buckets(vec![
            1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
        ]),
        &["result"], // "ready", "failed"
    )
    .unwrap()
});

// =============================================================================
// Polling Metrics
// =============================================================================

/// Status queries by outcome.
pub static POLL_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("reelgrab_poll_queries_total", "Total job status queries"),
        &["outcome"], // "progress", "complete", "failed", "fault"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(JOBS_CANCELLED.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(POLL_QUERIES.clone()),
    ]
}
