//! Mock collector and sender
//!
//! Used for tests that run without a real metrics service.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

use contracts::{Outcome, SinkError};

use crate::sender::BatchSender;

/// Scripted reply of the mock collector
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with a status code and body
    Respond { status: u16, body: Bytes },
    /// Read the request, then drop the connection without answering
    Hangup,
}

impl MockReply {
    /// `200 OK` with the given body
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::status(200, body)
    }

    /// Arbitrary status with the given body
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        Self::Respond {
            status,
            body: body.into(),
        }
    }
}

/// One request captured by the mock collector
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Body as text
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
struct CollectorState {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CapturedRequest>>,
}

impl CollectorState {
    /// Pop the next scripted reply; the last one repeats forever
    fn next_reply(&self) -> MockReply {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        if script.len() > 1 {
            script.pop_front().unwrap_or_else(|| MockReply::ok("{}"))
        } else {
            script.front().cloned().unwrap_or_else(|| MockReply::ok("{}"))
        }
    }

    fn capture(&self, request: CapturedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

/// In-process HTTP collector on a loopback port
///
/// Every path is routed to one handler that captures the request and
/// answers from the reply script.
pub struct MockCollector {
    addr: SocketAddr,
    state: Arc<CollectorState>,
    task: JoinHandle<()>,
}

impl MockCollector {
    /// Bind a loopback port and start serving the reply script
    pub async fn start(script: Vec<MockReply>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(CollectorState {
            script: Mutex::new(script.into()),
            requests: Mutex::default(),
        });

        let router = Router::new()
            .fallback(collect)
            .with_state(Arc::clone(&state));
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!(error = %e, "Mock collector stopped");
            }
        });

        debug!(%addr, "Mock collector started");
        Ok(Self { addr, state, task })
    }

    /// Listening address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Collector URL (`http://<addr>/v1/metrics`)
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/v1/metrics", self.addr))
            .expect("socket address forms a valid url")
    }

    /// Requests captured so far
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Poll until at least `count` requests arrived or `timeout` elapsed
    pub async fn wait_for_requests(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Vec<CapturedRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let requests = self.requests();
            if requests.len() >= count || tokio::time::Instant::now() >= deadline {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for MockCollector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn collect(
    State(state): State<Arc<CollectorState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    trace!(%method, %uri, bytes = body.len(), "Mock collector received request");
    let reply = state.next_reply();
    state.capture(CapturedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body: body.to_vec(),
    });

    match reply {
        MockReply::Respond { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        // Unwinding ends the connection task, so the socket closes with no
        // response written. `resume_unwind` skips the panic hook.
        MockReply::Hangup => std::panic::resume_unwind(Box::new("mock collector hangup")),
    }
}

#[derive(Default)]
struct RecordingState {
    batches: Mutex<Vec<Vec<Bytes>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory `BatchSender` that records every batch
///
/// Clones share the recorded state.
#[derive(Clone, Default)]
pub struct RecordingSender {
    state: Arc<RecordingState>,
    fail_first: usize,
    delay: Duration,
}

impl RecordingSender {
    /// Sender that accepts every batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` calls with a network failure
    pub fn fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Sleep for `delay` inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Batches accepted so far, in send order
    pub fn batches(&self) -> Vec<Vec<Bytes>> {
        self.state
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All accepted records, flattened in send order
    pub fn records(&self) -> Vec<Bytes> {
        self.batches().into_iter().flatten().collect()
    }

    /// Number of `send_batch` calls, failed ones included
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `send_batch` calls observed
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl BatchSender for RecordingSender {
    async fn send_batch(&self, batch: &[Bytes]) -> Result<Outcome, SinkError> {
        let call = self.state.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if call < self.fail_first {
            return Err(SinkError::network("mock://collector", "induced failure"));
        }

        self.state
            .batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch.to_vec());
        Ok(Outcome::new(
            "200 OK",
            format!("{{\"records\":{}}}", batch.len()),
        ))
    }
}
