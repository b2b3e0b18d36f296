//! Scripted transport for testing.

use async_trait::async_trait;
use bulwark::{Response, Transport, TransportError, TransportErrorKind, TransportRequest};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Respond with an empty body
    Status(u16),
    /// Respond with a body
    Body(u16, String),
    /// Respond with one header
    Header(u16, String, String),
    /// Fail without a response
    Fail(TransportErrorKind),
    /// Never answer within any sensible timeout
    Hang,
}

/// Transport that replays a script, then repeats a fallback reply.
///
/// Every dispatch is counted and timestamped, and the number of dispatches
/// in progress is tracked so tests can assert on concurrency.
pub struct MockTransport {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    latency: Duration,
    calls: AtomicUsize,
    live: AtomicUsize,
    peak: AtomicUsize,
    dispatches: Mutex<Vec<(Instant, String)>>,
}

impl MockTransport {
    /// Always answers `reply`.
    pub fn always(reply: MockReply) -> Self {
        Self::sequence(Vec::new(), reply)
    }

    /// Answers `script` in order, then `fallback` forever.
    pub fn sequence(script: Vec<MockReply>, fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            dispatches: Mutex::new(Vec::new()),
        }
    }

    /// Answers `statuses` in order, then 200 forever.
    pub fn statuses(statuses: &[u16]) -> Self {
        Self::sequence(
            statuses.iter().copied().map(MockReply::Status).collect(),
            MockReply::Status(200),
        )
    }

    /// Sleeps this long inside every dispatch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Dispatches received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most dispatches observed in progress at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// When each dispatch arrived.
    pub fn times(&self) -> Vec<Instant> {
        self.dispatches.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    /// URL of each dispatch.
    pub fn urls(&self) -> Vec<String> {
        self.dispatches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Gaps between consecutive dispatches.
    pub fn gaps(&self) -> Vec<Duration> {
        self.times()
            .windows(2)
            .map(|pair| pair[1].duration_since(pair[0]))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn dispatch(&self, request: &TransportRequest) -> Result<Response, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dispatches
            .lock()
            .unwrap()
            .push((Instant::now(), request.url().clone()));
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if matches!(reply, MockReply::Hang) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.live.fetch_sub(1, Ordering::SeqCst);

        let method = *request.method();
        let url = request.url().clone();
        match reply {
            MockReply::Status(status) => Ok(Response::new(status, method, url)),
            MockReply::Body(status, body) => Ok(Response::new(status, method, url).with_body(body)),
            MockReply::Header(status, name, value) => {
                Ok(Response::new(status, method, url).with_header(name, value))
            }
            MockReply::Fail(kind) => Err(TransportError::new(kind)),
            MockReply::Hang => Ok(Response::new(200, method, url)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
