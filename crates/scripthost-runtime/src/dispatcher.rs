//! The UI thread and its FIFO work queue.
//!
//! All UI-tree mutation happens on one dedicated thread. Other threads hand
//! work over with [`UiDispatcher::post`]; posted tasks run one at a time in
//! arrival order, with no priorities.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, error, trace};

use scripthost_devsupport::bridge;

use crate::error::{HostError, Result};

type UiTask = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(UiTask),
    Shutdown,
}

/// Cloneable handle for posting work to the UI thread.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<Message>,
    thread: ThreadId,
}

impl UiDispatcher {
    /// Spawns a UI thread named `name`.
    ///
    /// The thread is marked so that blocking dev-support calls on it fail
    /// instead of stalling the UI.
    pub fn spawn(name: &str) -> Result<(UiDispatcher, UiThread)> {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                bridge::forbid_blocking_on_current_thread();
                run_loop(rx);
            })?;

        let dispatcher = UiDispatcher {
            tx,
            thread: join.thread().id(),
        };
        debug!(name = %name, "UI thread started");

        Ok((
            dispatcher.clone(),
            UiThread {
                dispatcher,
                join: Some(join),
            },
        ))
    }

    /// Posts `task` to the back of the UI queue.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.tx
            .send(Message::Run(Box::new(task)))
            .map_err(|_| HostError::DispatcherClosed)
    }

    /// Returns true on the UI thread.
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Runs `f` on the UI thread and waits for its result.
    ///
    /// On the UI thread itself `f` runs inline.
    pub fn invoke<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_ui_thread() {
            return Ok(f());
        }

        let (tx, rx) = mpsc::channel();
        self.post(move || {
            let _ = tx.send(f());
        })?;
        rx.recv().map_err(|_| HostError::DispatcherClosed)
    }

    /// Waits until every task posted before this call has run.
    pub fn flush(&self) -> Result<()> {
        self.invoke(|| ())
    }
}

fn run_loop(rx: Receiver<Message>) {
    for message in rx {
        match message {
            Message::Run(task) => {
                trace!("running UI task");
                if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                    error!("UI task panicked");
                }
            }
            Message::Shutdown => break,
        }
    }
    debug!("UI thread stopped");
}

/// Owner of the UI thread. Dropping it stops the thread after the tasks
/// already queued have run.
pub struct UiThread {
    dispatcher: UiDispatcher,
    join: Option<JoinHandle<()>>,
}

impl UiThread {
    /// Drains the queue, stops the thread and joins it.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        let _ = self.dispatcher.tx.send(Message::Shutdown);
        if self.dispatcher.is_ui_thread() {
            // Cannot join ourselves; the loop exits after this task.
            return Ok(());
        }
        join.join().map_err(|_| HostError::DispatcherClosed)
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
