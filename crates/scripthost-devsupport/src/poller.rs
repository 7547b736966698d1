//! Live-reload poller.
//!
//! Issues long-poll GETs against the dev server's change endpoint in a
//! background task until cancelled. Cancellation is cooperative: the flag is
//! sampled at the top of each iteration and once more before firing the
//! change callback, so a request already in flight completes on its own but
//! never triggers a callback after [`LiveReloadPoller::stop`].
//!
//! Change callbacks run on a dedicated `live-reload` thread owned by the loop,
//! outside the async runtime. They may block, and may call the client's
//! blocking operations. The loop waits for each callback to return before
//! polling again.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;
use std::{io, thread};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpTransport};

/// Status the dev server answers with when sources changed.
pub const RESET_CONTENT: u16 = 205;

/// Callback fired when the dev server reports a change.
pub type OnChange = Arc<dyn Fn() + Send + Sync>;

/// Why a poll loop ended.
#[derive(Debug, Clone)]
pub enum PollExit {
    /// The cancellation flag was observed.
    Cancelled,
    /// A non-ignorable transport error stopped the loop.
    Failed(TransportError),
    /// The callback thread went away.
    CallbackLost,
}

type ExitSlot = Arc<Mutex<Option<PollExit>>>;

/// One running loop.
struct PollSession {
    cancelled: Arc<AtomicBool>,
    exit: ExitSlot,
    task: JoinHandle<()>,
}

/// Runs at most one live-reload loop at a time.
pub struct LiveReloadPoller {
    transport: Arc<dyn HttpTransport>,
    handle: Handle,
    exception_flag: Arc<AtomicBool>,
    backoff: Duration,
    session: Mutex<Option<PollSession>>,
}

impl LiveReloadPoller {
    /// Creates a stopped poller.
    ///
    /// `exception_flag` is set when a loop dies on a fatal transport error.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        handle: Handle,
        exception_flag: Arc<AtomicBool>,
        backoff: Duration,
    ) -> Self {
        Self {
            transport,
            handle,
            exception_flag,
            backoff,
            session: Mutex::new(None),
        }
    }

    /// Starts polling `url`, invoking `on_change` on every 205.
    ///
    /// A loop that is still running is cancelled first; each loop gets its
    /// own fresh cancellation flag. If the callback thread cannot be started
    /// no loop runs and the exception flag is set.
    pub fn start(&self, url: String, on_change: OnChange) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = session.take() {
            debug!("replacing running live reload loop");
            previous.cancelled.store(true, Ordering::SeqCst);
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let notifier = match ChangeNotifier::spawn(on_change, Arc::clone(&cancelled)) {
            Ok(notifier) => notifier,
            Err(e) => {
                warn!(error = %e, "could not start live reload callback thread");
                self.exception_flag.store(true, Ordering::SeqCst);
                return;
            }
        };

        let exit: ExitSlot = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&exit);
        let run = poll_loop(
            Arc::clone(&self.transport),
            url,
            Arc::clone(&cancelled),
            notifier,
            Arc::clone(&self.exception_flag),
            self.backoff,
        );
        let task = self.handle.spawn(async move {
            let reason = run.await;
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason);
        });

        *session = Some(PollSession {
            cancelled,
            exit,
            task,
        });
    }

    /// Requests the loop to stop. Does not wait for an in-flight request.
    pub fn stop(&self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(s) = session.as_ref() {
            s.cancelled.store(true, Ordering::SeqCst);
        }
    }

    /// Returns true while a loop task is alive.
    pub fn is_polling(&self) -> bool {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.as_ref().is_some_and(|s| !s.task.is_finished())
    }

    /// Why the most recent loop ended, or `None` while it runs.
    pub fn last_exit(&self) -> Option<PollExit> {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session
            .as_ref()
            .and_then(|s| s.exit.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

impl Drop for LiveReloadPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hands change notifications to the loop's callback thread.
///
/// The thread exits once the notifier is dropped.
struct ChangeNotifier {
    tx: mpsc::Sender<oneshot::Sender<()>>,
}

impl ChangeNotifier {
    fn spawn(on_change: OnChange, cancelled: Arc<AtomicBool>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<oneshot::Sender<()>>();
        thread::Builder::new()
            .name("live-reload".to_string())
            .spawn(move || {
                for done in rx {
                    if !cancelled.load(Ordering::SeqCst)
                        && panic::catch_unwind(AssertUnwindSafe(|| on_change())).is_err()
                    {
                        error!("live reload callback panicked");
                    }
                    let _ = done.send(());
                }
            })?;
        Ok(Self { tx })
    }

    /// Runs the callback and waits for it to return. False if the callback
    /// thread is gone.
    async fn notify(&self) -> bool {
        let (done, finished) = oneshot::channel();
        if self.tx.send(done).is_err() {
            return false;
        }
        finished.await.is_ok()
    }
}

async fn poll_loop(
    transport: Arc<dyn HttpTransport>,
    url: String,
    cancelled: Arc<AtomicBool>,
    notifier: ChangeNotifier,
    exception_flag: Arc<AtomicBool>,
    backoff: Duration,
) -> PollExit {
    debug!(url = %url, "live reload polling started");

    while !cancelled.load(Ordering::SeqCst) {
        let request = HttpRequest::get(url.as_str())
            .with_keep_alive(true)
            .with_read_body(false);

        match transport.get(request).await {
            Ok(response) => {
                if response.status == RESET_CONTENT && !cancelled.load(Ordering::SeqCst) {
                    debug!(url = %url, "dev server reported a change");
                    if !notifier.notify().await {
                        warn!(url = %url, "live reload callback thread exited");
                        return PollExit::CallbackLost;
                    }
                } else {
                    trace!(status = response.status, "long-poll completed without change");
                }
            }
            Err(e) if e.kind().is_ignorable_for_poll() => {
                trace!(error = %e, "ignoring poll error");
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "live reload stopped");
                exception_flag.store(true, Ordering::SeqCst);
                return PollExit::Failed(e);
            }
        }
    }

    debug!(url = %url, "live reload polling cancelled");
    PollExit::Cancelled
}
