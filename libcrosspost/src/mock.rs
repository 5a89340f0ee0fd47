//! Test doubles for the transport and publisher seams
//!
//! [`MockTransport`] replays scripted responses and records every request, so
//! tests can assert both what was sent and that nothing was sent.
//! [`MockPublisher`] stands in for a whole provider in orchestrator tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ErrorRecord;
use crate::provider::Provider;
use crate::providers::Publisher;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::types::{Container, Identity, PostPayload, PublishedPost, TargetContainer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Scripted HTTP transport
///
/// Replies are consumed in order. When the script runs out the transport
/// answers with a connection failure, which surfaces as a `NetworkError`.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: HttpResponse) {
        lock(&self.replies).push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(HttpResponse::new(status, body.to_string()));
    }

    pub fn push_empty(&self, status: u16) {
        self.push_response(HttpResponse::new(status, Vec::new()));
    }

    /// Fail the next request before any response
    pub fn push_failure(&self, summary: &str, detail: &str) {
        lock(&self.replies).push_back(Err(TransportError::new(summary, detail)));
    }

    /// Requests sent so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Scripted replies not yet consumed
    pub fn pending(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        lock(&self.requests).push(request);
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                crate::transport::CONNECT_FAILED,
                format!("no scripted reply for {}", url),
            ))
        })
    }
}

/// Canned behavior for a [`MockPublisher`]
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub provider: Provider,

    /// Error to return from `publish`; `None` succeeds
    pub publish_error: Option<ErrorRecord>,

    /// Error to return from `identity`; `None` succeeds
    pub identity_error: Option<ErrorRecord>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Number of times publish has been called
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Texts that have been published (for verification)
    pub published_text: Arc<Mutex<Vec<String>>>,

    /// Target of each published payload, in call order
    pub published_targets: Arc<Mutex<Vec<Option<TargetContainer>>>>,
}

impl MockConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            publish_error: None,
            identity_error: None,
            delay: Duration::from_millis(0),
            publish_call_count: Arc::new(Mutex::new(0)),
            published_text: Arc::new(Mutex::new(Vec::new())),
            published_targets: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Provider stand-in for orchestrator tests
pub struct MockPublisher {
    config: MockConfig,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A publisher that always succeeds
    pub fn success(provider: Provider) -> Self {
        Self::new(MockConfig::new(provider))
    }

    /// A publisher whose `publish` fails with `error`
    pub fn failure(error: ErrorRecord) -> Self {
        Self::new(MockConfig {
            publish_error: Some(error.clone()),
            ..MockConfig::new(error.provider)
        })
    }

    pub fn with_delay(provider: Provider, delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..MockConfig::new(provider)
        })
    }

    /// Handle to the shared counters, usable after the publisher is boxed
    pub fn config(&self) -> MockConfig {
        self.config.clone()
    }

    pub fn publish_call_count(&self) -> usize {
        *lock(&self.config.publish_call_count)
    }

    pub fn published_text(&self) -> Vec<String> {
        lock(&self.config.published_text).clone()
    }

    pub fn published_targets(&self) -> Vec<Option<TargetContainer>> {
        lock(&self.config.published_targets).clone()
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn provider(&self) -> Provider {
        self.config.provider
    }

    async fn identity(&mut self) -> Result<Identity, ErrorRecord> {
        self.simulate_latency().await;
        match &self.config.identity_error {
            Some(error) => Err(error.clone()),
            None => Ok(Identity {
                id: format!("mock-{}-user", self.config.provider),
                name: Some("Mock User".to_string()),
                email: None,
            }),
        }
    }

    async fn containers(&mut self) -> Result<Vec<Container>, ErrorRecord> {
        self.simulate_latency().await;
        Ok(vec![Container {
            id: format!("mock-{}-container", self.config.provider),
            name: "Mock container".to_string(),
            url: None,
        }])
    }

    async fn publish(&mut self, payload: &PostPayload) -> Result<PublishedPost, ErrorRecord> {
        *lock(&self.config.publish_call_count) += 1;
        self.simulate_latency().await;

        if let Some(error) = &self.config.publish_error {
            return Err(error.clone());
        }

        lock(&self.config.published_text).push(payload.text.clone());
        lock(&self.config.published_targets).push(payload.target.clone());
        let id = format!("mock-{}-{}", self.config.provider, uuid::Uuid::new_v4());
        Ok(PublishedPost {
            url: Some(format!("https://example.invalid/{}", id)),
            id: Some(id),
        })
    }
}
