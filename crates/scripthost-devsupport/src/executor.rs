//! Proxy-mode executor.
//!
//! In proxy mode script code runs in an external debugger reached through
//! the dev server's WebSocket proxy. The executor only carries frames: it
//! never looks inside them except to spot the reply to its own
//! `prepareJSRuntime` request, which marks the debugger as attached.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::DebuggerCallbacks;
use crate::error::{DevSupportError, Result};

/// A unit of work posted to a queue.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A serialized work queue owned by the script engine.
pub trait WorkQueue: Send + Sync {
    /// Enqueues `task`; tasks run in arrival order.
    fn run_on_queue(&self, task: Task);
}

/// Receives frames coming back from the debugger.
pub trait ExecutorDelegate: Send + Sync {
    /// Handles one opaque frame. Runs on the executor's work queue.
    fn on_frame(&self, frame: Value);
}

/// Connection state of a [`ProxyExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyState {
    /// Not connected yet, or closed by the owner.
    Disconnected,
    /// Connected; no debugger has picked up the session.
    WaitingForDebugger,
    /// A debugger answered the runtime preparation request.
    Attached,
    /// The connection failed or dropped.
    Failed(String),
}

/// Request frame the executor itself sends.
#[derive(Serialize)]
struct Request {
    id: u64,
    method: &'static str,
}

/// State shared between the executor and its socket tasks.
struct Shared {
    state: Mutex<ProxyState>,
    callbacks: DebuggerCallbacks,
    delegate: Arc<dyn ExecutorDelegate>,
    queue: Arc<dyn WorkQueue>,
}

impl Shared {
    fn state(&self) -> ProxyState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_state(&self, state: ProxyState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn fail(&self, message: String) {
        if self.state() == ProxyState::Disconnected {
            // Closed by the owner.
            return;
        }
        warn!(error = %message, "proxy connection failed");
        self.set_state(ProxyState::Failed(message));
        self.callbacks.error();
    }

    fn route(&self, text: &str, prepare_id: u64) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "dropping malformed proxy frame");
                return;
            }
        };

        let is_prepare_reply = frame.get("replyID").and_then(Value::as_u64) == Some(prepare_id);
        if is_prepare_reply && self.state() == ProxyState::WaitingForDebugger {
            info!("debugger attached");
            self.set_state(ProxyState::Attached);
            self.callbacks.debugger_attached();
            return;
        }

        let delegate = Arc::clone(&self.delegate);
        self.queue.run_on_queue(Box::new(move || delegate.on_frame(frame)));
    }
}

/// Carries execution frames to and from a remote debugger.
pub struct ProxyExecutor {
    shared: Arc<Shared>,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ProxyExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyExecutor")
            .field("state", &self.shared.state())
            .finish()
    }
}

impl ProxyExecutor {
    /// Creates a disconnected executor.
    pub fn new(
        delegate: Arc<dyn ExecutorDelegate>,
        queue: Arc<dyn WorkQueue>,
        callbacks: DebuggerCallbacks,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ProxyState::Disconnected),
                callbacks,
                delegate,
                queue,
            }),
            outgoing: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ProxyState {
        self.shared.state()
    }

    /// Connects to the proxy at `url` and requests a runtime.
    ///
    /// Resolves once the handshake settled. The reader and writer run as
    /// tasks on the current runtime for as long as the socket stays open.
    pub async fn connect(&self, url: &str) -> Result<()> {
        debug!(url = %url, "connecting to debugger proxy");

        let (stream, _) = match connect_async(url).await {
            Ok(s) => s,
            Err(e) => {
                let message = e.to_string();
                // Not connected yet, so `fail` would treat this as an owner close.
                self.shared.set_state(ProxyState::Failed(message.clone()));
                self.shared.callbacks.error();
                return Err(DevSupportError::ProxyConnect(message));
            }
        };

        let (mut write, mut read) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if write.send(message).await.is_err() {
                    break;
                }
            }
        });

        let prepare_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let prepare = serde_json::to_string(&Request {
            id: prepare_id,
            method: "prepareJSRuntime",
        })?;
        tx.send(Message::Text(prepare))
            .map_err(|_| DevSupportError::ProxyNotConnected)?;
        *self.outgoing.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);

        self.shared.set_state(ProxyState::WaitingForDebugger);
        self.shared.callbacks.waiting_for_debugger();

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => shared.route(&text, prepare_id),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        shared.fail(e.to_string());
                        return;
                    }
                }
            }
            shared.fail("connection closed".to_string());
        });

        info!(url = %url, "connected to debugger proxy");
        Ok(())
    }

    /// Sends one opaque frame to the debugger.
    pub fn send_frame(&self, frame: &Value) -> Result<()> {
        let text = serde_json::to_string(frame)?;
        let outgoing = self.outgoing.lock().unwrap_or_else(|e| e.into_inner());
        match outgoing.as_ref() {
            Some(tx) => tx
                .send(Message::Text(text))
                .map_err(|_| DevSupportError::ProxyNotConnected),
            None => Err(DevSupportError::ProxyNotConnected),
        }
    }

    /// Closes the connection without reporting an error.
    pub fn close(&self) {
        self.shared.set_state(ProxyState::Disconnected);
        if let Some(tx) = self.outgoing.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = tx.send(Message::Close(None));
        }
    }
}

impl Drop for ProxyExecutor {
    fn drop(&mut self) {
        self.close();
    }
}
