use crate::domain::ports::{Transport, TransportResponse};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A canned reply from `MockTransport`
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(TransportResponse),
    /// Transport-level failure (no HTTP response)
    Failure(String),
}

#[derive(Default)]
struct MockState {
    /// One-shot replies, consumed in order
    queued: VecDeque<MockReply>,
    /// Sticky replies for URLs containing a pattern, first match wins
    routes: Vec<(String, MockReply)>,
    default_reply: Option<MockReply>,
    calls: Vec<(String, Instant)>,
}

/// Scripted `Transport` for tests: queued replies first, then routes, then
/// the default reply. Records every call with its (Tokio) timestamp.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow upstream; each call sleeps this long before replying
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            latency,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn push(&self, reply: MockReply) {
        self.lock().queued.push_back(reply);
    }

    pub fn push_ok(&self, body: impl Into<String>) {
        self.push(MockReply::Response(TransportResponse::ok(body)));
    }

    pub fn push_status(&self, status: u16) {
        self.push(MockReply::Response(TransportResponse::with_status(status)));
    }

    pub fn push_rate_limited(&self, retry_after: Option<Duration>) {
        self.push(MockReply::Response(TransportResponse {
            status: 429,
            retry_after,
            body: String::new(),
        }));
    }

    pub fn push_failure(&self, reason: impl Into<String>) {
        self.push(MockReply::Failure(reason.into()));
    }

    pub fn route(&self, url_pattern: impl Into<String>, reply: MockReply) {
        self.lock().routes.push((url_pattern.into(), reply));
    }

    pub fn route_ok(&self, url_pattern: impl Into<String>, body: impl Into<String>) {
        self.route(url_pattern, MockReply::Response(TransportResponse::ok(body)));
    }

    pub fn set_default(&self, reply: MockReply) {
        self.lock().default_reply = Some(reply);
    }

    pub fn set_default_ok(&self, body: impl Into<String>) {
        self.set_default(MockReply::Response(TransportResponse::ok(body)));
    }

    pub fn set_default_status(&self, status: u16) {
        self.set_default(MockReply::Response(TransportResponse::with_status(status)));
    }

    pub fn set_default_failure(&self, reason: impl Into<String>) {
        self.set_default(MockReply::Failure(reason.into()));
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Calls whose URL contains `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(url, _)| url.contains(pattern))
            .count()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.lock().calls.iter().map(|(_, at)| *at).collect()
    }

    pub fn called_urls(&self) -> Vec<String> {
        self.lock().calls.iter().map(|(url, _)| url.clone()).collect()
    }

    fn next_reply(&self, url: &str) -> Option<MockReply> {
        let mut state = self.lock();
        state.calls.push((url.to_string(), Instant::now()));

        if let Some(reply) = state.queued.pop_front() {
            return Some(reply);
        }
        if let Some((_, reply)) = state
            .routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
        {
            return Some(reply.clone());
        }
        state.default_reply.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let reply = self.next_reply(url);
        debug!("MockTransport: GET {} -> {:?}", url, reply);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure(reason)) => anyhow::bail!("{}", reason),
            None => Ok(TransportResponse::with_status(404)),
        }
    }
}
