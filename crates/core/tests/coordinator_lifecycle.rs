//! Coordinator lifecycle integration tests.
//!
//! These tests drive the coordinator against the mock backend through the
//! complete job lifecycle:
//! idle -> submitting -> in_progress -> ready | failed, and back via reset

use std::sync::Arc;
use std::time::Duration;

use reelgrab_core::{
    testing::{fixtures, MockBackend},
    BackendError, CoordinatorConfig, CoordinatorError, JobCoordinator, JobFailure, JobId,
    JobRequest, JobSnapshot, JobState, PollerConfig, QualityOption, RequestError,
};

/// Test helper owning the mock backend and the coordinator under test.
struct TestHarness {
    backend: MockBackend,
    coordinator: Arc<JobCoordinator>,
}

impl TestHarness {
    fn new() -> Self {
        let backend = MockBackend::new();
        let coordinator = Arc::new(fixtures::fast_coordinator(Arc::new(backend.clone())));
        Self {
            backend,
            coordinator,
        }
    }

    fn with_poller(poller: PollerConfig) -> Self {
        let backend = MockBackend::new();
        let coordinator = Arc::new(JobCoordinator::new(
            Arc::new(backend.clone()),
            poller,
            fixtures::fast_coordinator_config(),
        ));
        Self {
            backend,
            coordinator,
        }
    }

    /// Wait for a matching snapshot, failing the test after a minute of
    /// (virtual) time.
    async fn wait_for<F>(&self, predicate: F) -> JobSnapshot
    where
        F: FnMut(&JobSnapshot) -> bool,
    {
        tokio::time::timeout(
            Duration::from_secs(60),
            self.coordinator.wait_until(predicate),
        )
        .await
        .expect("Timed out waiting for coordinator state")
    }

    async fn wait_for_state(&self, state: JobState) -> JobSnapshot {
        self.wait_for(|s| s.state == state).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_successful_job_reaches_ready_with_artifact() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("42").await;
    harness
        .backend
        .script_progress("42", &[0, 25, 60, 100])
        .await;

    let job_id = harness
        .coordinator
        .submit(fixtures::request(QualityOption::High))
        .await
        .unwrap();
    assert_eq!(job_id, JobId::new("42"));

    let in_progress = harness.coordinator.snapshot();
    assert_eq!(in_progress.state, JobState::InProgress);
    assert_eq!(in_progress.percent, 0);
    assert_eq!(in_progress.job_id, Some(JobId::new("42")));

    let ready = harness.wait_for_state(JobState::Ready).await;
    assert_eq!(ready.percent, 100);
    assert!(ready.error.is_none());

    let with_artifact = harness.wait_for(|s| s.artifact.is_some()).await;
    let artifact = with_artifact.artifact.unwrap();
    assert_eq!(artifact.job_id, JobId::new("42"));
    assert_eq!(artifact.url, "http://mock-backend/get-file?job_id=42");

    let requests = harness.backend.start_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].quality, QualityOption::High);
    assert_eq!(requests[0].source_url, "https://youtu.be/abc");
}

#[tokio::test(start_paused = true)]
async fn test_backend_reported_failure() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("7").await;
    harness.backend.script_progress("7", &[0, 10, -1]).await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    let failed = harness.wait_for_state(JobState::Failed).await;
    assert_eq!(failed.error, Some(JobFailure::Reported));
    assert!(failed.artifact.is_none());
    assert_eq!(failed.percent, 10);

    // No further status queries after the terminal answer.
    let queries = harness.backend.progress_queries("7").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.backend.progress_queries("7").await, queries);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_request_leaves_state_unchanged() {
    let harness = TestHarness::new();
    let before = harness.coordinator.snapshot();

    let result = harness
        .coordinator
        .submit(JobRequest::new("", QualityOption::Best))
        .await;
    assert_eq!(
        result,
        Err(CoordinatorError::InvalidRequest(RequestError::EmptyUrl))
    );

    let result = harness
        .coordinator
        .submit(JobRequest::new("not a url", QualityOption::Low))
        .await;
    assert!(matches!(result, Err(CoordinatorError::InvalidRequest(_))));

    assert_eq!(harness.coordinator.snapshot(), before);
    assert!(harness.backend.start_requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_mid_job_stops_polling() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("9").await;
    harness.backend.script_progress("9", &[10, 20, 30]).await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Medium))
        .await
        .unwrap();
    harness.wait_for(|s| s.percent >= 20).await;

    let snapshot = harness.coordinator.reset().await;
    assert!(snapshot.is_cleared());
    assert_eq!(harness.coordinator.snapshot().state, JobState::Idle);

    let queries = harness.backend.progress_queries("9").await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.backend.progress_queries("9").await, queries);
    assert!(harness.coordinator.snapshot().is_cleared());
}

#[tokio::test(start_paused = true)]
async fn test_submission_failure_moves_to_failed() {
    let harness = TestHarness::new();
    harness
        .backend
        .set_next_start_error(BackendError::Status {
            status: 400,
            message: "No URL provided".to_string(),
        })
        .await;

    let result = harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await;
    assert!(matches!(
        result,
        Err(CoordinatorError::Submission(BackendError::Status { status: 400, .. }))
    ));

    let snapshot = harness.coordinator.snapshot();
    assert_eq!(snapshot.state, JobState::Failed);
    assert!(snapshot.job_id.is_none());
    match snapshot.error {
        Some(JobFailure::Submission { message }) => {
            assert!(message.contains("No URL provided"), "{}", message)
        }
        other => panic!("expected submission failure, got {:?}", other),
    }
    assert_eq!(harness.backend.total_progress_queries().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_resubmit_after_terminal_state() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("first").await;
    harness.backend.push_job_id("second").await;
    harness.backend.script_progress("first", &[-1]).await;
    harness.backend.script_progress("second", &[50, 100]).await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();
    harness.wait_for_state(JobState::Failed).await;

    let job_id = harness
        .coordinator
        .submit(fixtures::request(QualityOption::AudioOnly))
        .await
        .unwrap();
    assert_eq!(job_id.as_str(), "second");

    let snapshot = harness.coordinator.snapshot();
    assert_eq!(snapshot.state, JobState::InProgress);
    assert!(snapshot.error.is_none());

    harness.wait_for(|s| s.artifact.is_some()).await;

    // Ready also accepts a fresh submission.
    let third = harness
        .coordinator
        .submit(fixtures::request(QualityOption::Low))
        .await
        .unwrap();
    assert_eq!(third.as_str(), "mock-job-1");
    assert!(harness.coordinator.snapshot().artifact.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_busy_while_in_progress() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("busy").await;
    harness.backend.script_progress("busy", &[5]).await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    let result = harness
        .coordinator
        .submit(fixtures::request(QualityOption::Low))
        .await;
    assert_eq!(
        result,
        Err(CoordinatorError::Busy {
            state: JobState::InProgress
        })
    );
    assert_eq!(harness.backend.start_requests().await.len(), 1);
    assert_eq!(
        harness.coordinator.snapshot().job_id,
        Some(JobId::new("busy"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_percent_never_decreases() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("wobbly").await;
    harness
        .backend
        .script_progress("wobbly", &[10, 40, 30, 35, 50, 100])
        .await;

    let mut rx = harness.coordinator.subscribe();
    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    let mut last = 0;
    loop {
        tokio::time::timeout(Duration::from_secs(60), rx.changed())
            .await
            .expect("Timed out waiting for update")
            .unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(
            snapshot.percent >= last,
            "percent went from {} to {}",
            last,
            snapshot.percent
        );
        last = snapshot.percent;
        if snapshot.state == JobState::Ready {
            break;
        }
    }
    assert_eq!(last, 100);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_states_are_exclusive() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("done").await;
    // Anything after the terminal answer must never be observed.
    harness
        .backend
        .script_progress("done", &[100, -1, 20])
        .await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();
    harness.wait_for(|s| s.artifact.is_some()).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = harness.coordinator.snapshot();
    assert_eq!(snapshot.state, JobState::Ready);
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.percent, 100);
    assert_eq!(harness.backend.progress_queries("done").await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_during_grace_never_publishes_artifact() {
    let backend = MockBackend::new();
    let coordinator = JobCoordinator::new(
        Arc::new(backend.clone()),
        fixtures::fast_poller_config(),
        CoordinatorConfig {
            artifact_grace_ms: 5_000,
        },
    );
    backend.push_job_id("grace").await;
    backend.script_progress("grace", &[100]).await;

    coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();
    coordinator.wait_until(|s| s.state == JobState::Ready).await;
    assert!(coordinator.snapshot().artifact.is_none());

    coordinator.reset().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(coordinator.snapshot().is_cleared());
}

#[tokio::test(start_paused = true)]
async fn test_stale_progress_ignored_after_resubmit() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("A").await;
    harness.backend.push_job_id("B").await;
    harness.backend.script_progress("A", &[90]).await;
    harness.backend.script_progress("B", &[5]).await;
    // Slow status answers so job A has a query in flight when it is reset.
    harness
        .backend
        .set_progress_delay(Duration::from_millis(50))
        .await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();
    // Let A's first query start but not finish.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(harness.backend.progress_queries("A").await, 1);

    harness.coordinator.reset().await;
    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = harness.coordinator.snapshot();
    assert_eq!(snapshot.job_id, Some(JobId::new("B")));
    assert_eq!(snapshot.percent, 5);
    assert_eq!(snapshot.state, JobState::InProgress);
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_idempotent() {
    let harness = TestHarness::new();
    let mut rx = harness.coordinator.subscribe();

    let first = harness.coordinator.reset().await;
    let second = harness.coordinator.reset().await;
    assert!(first.is_cleared());
    assert!(second.is_cleared());
    assert!(!rx.has_changed().unwrap());

    // Reset from a terminal state clears error details too.
    harness
        .backend
        .set_next_start_error(BackendError::Timeout)
        .await;
    let _ = harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await;
    assert_eq!(harness.coordinator.snapshot().state, JobState::Failed);

    harness.coordinator.reset().await;
    harness.coordinator.reset().await;
    let snapshot = harness.coordinator.snapshot();
    assert!(snapshot.is_cleared());
}

#[tokio::test(start_paused = true)]
async fn test_poll_faults_escalate_to_failure() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("flaky").await;
    for _ in 0..3 {
        harness
            .backend
            .push_progress_error("flaky", BackendError::ConnectionFailed("refused".into()))
            .await;
    }

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    let failed = harness.wait_for_state(JobState::Failed).await;
    match failed.error {
        Some(JobFailure::PollFaults {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("refused"), "{}", last_error);
        }
        other => panic!("expected poll fault failure, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_faults_recover() {
    let harness = TestHarness::new();
    harness.backend.push_job_id("blip").await;
    harness.backend.push_progress("blip", 20).await;
    harness
        .backend
        .push_progress_error("blip", BackendError::Timeout)
        .await;
    harness
        .backend
        .push_progress_error("blip", BackendError::Timeout)
        .await;
    harness.backend.push_progress("blip", 70).await;
    harness.backend.push_progress("blip", 100).await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    let ready = harness.wait_for_state(JobState::Ready).await;
    assert!(ready.error.is_none());
    assert_eq!(ready.percent, 100);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_job_fails() {
    let harness = TestHarness::with_poller(PollerConfig {
        interval_ms: 100,
        max_consecutive_faults: 3,
        stall_timeout_secs: 2,
    });
    harness.backend.push_job_id("stuck").await;
    harness.backend.script_progress("stuck", &[40]).await;

    harness
        .coordinator
        .submit(fixtures::request(QualityOption::Best))
        .await
        .unwrap();

    let failed = harness.wait_for_state(JobState::Failed).await;
    assert_eq!(failed.error, Some(JobFailure::Stalled { stalled_secs: 2 }));
    assert_eq!(failed.percent, 40);
}
