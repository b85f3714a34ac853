//! Common test utilities for API testing with a mock backend.
//!
//! This module provides a test fixture that creates an in-process router
//! with the mock conversion backend injected, so the whole HTTP surface can
//! be exercised without a real conversion service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use reelgrab_core::{
    testing::MockBackend, BackendConfig, Config, JobCoordinator, JobSnapshot, ServerConfig,
};
use reelgrab_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use reelgrab_core::testing::fixtures;

/// Test fixture for API testing with a mock backend.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///     fixture.backend.push_job_id("42").await;
///
///     let response = fixture.post("/api/v1/job", json!({
///         "url": "https://youtu.be/abc",
///         "quality": "high"
///     })).await;
///
///     assert_eq!(response.status, StatusCode::ACCEPTED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock backend - script job ids and progress
    pub backend: MockBackend,
    /// The coordinator behind the router
    pub coordinator: Arc<JobCoordinator>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with fast poll timings.
    pub fn new() -> Self {
        let backend = MockBackend::new();

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            backend: BackendConfig::new("http://mock-backend"),
            poller: fixtures::fast_poller_config(),
            coordinator: fixtures::fast_coordinator_config(),
        };

        let coordinator = Arc::new(JobCoordinator::from_config(
            Arc::new(backend.clone()),
            &config,
        ));
        let state = Arc::new(AppState::new(config, Arc::clone(&coordinator)));
        let router = create_router(state);

        Self {
            router,
            backend,
            coordinator,
        }
    }

    /// Wait until the coordinator publishes a matching snapshot.
    pub async fn wait_for<F>(&self, predicate: F) -> JobSnapshot
    where
        F: FnMut(&JobSnapshot) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(10), self.coordinator.wait_until(predicate))
            .await
            .expect("Timed out waiting for job state")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse {
            status,
            location,
            body,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
