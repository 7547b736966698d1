//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{TransportError, TransportErrorKind};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, String),
    Fail(TransportErrorKind, String),
}

impl Step {
    pub fn respond(status: u16, body: &str) -> Self {
        Step::Respond(status, body.to_string())
    }

    pub fn fail(kind: TransportErrorKind, message: &str) -> Self {
        Step::Fail(kind, message.to_string())
    }
}

/// Answers requests from a fixed script. Once the script runs out every
/// further request stays in flight forever, like an idle long-poll.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let step = self.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Step::Fail(kind, message)) => Err(TransportError::new(kind, message)),
            None => std::future::pending().await,
        }
    }
}

/// Answers every request with `status`, but only once the test releases it.
pub struct GatedTransport {
    status: u16,
    gate: tokio::sync::Semaphore,
    requests: std::sync::atomic::AtomicUsize,
}

impl GatedTransport {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            gate: tokio::sync::Semaphore::new(0),
            requests: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for GatedTransport {
    async fn get(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(HttpResponse::new(self.status, ""))
    }
}

/// Polls `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: std::time::Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    cond()
}
