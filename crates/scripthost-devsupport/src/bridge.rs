//! Blocking-on-async bridge.
//!
//! The client's public operations are synchronous and block until the
//! underlying network call settles. They are meant for background threads
//! (a "load bundle" step, a CLI main thread) and must not run on the
//! exclusive UI thread. Threads that must never block mark themselves with
//! [`forbid_blocking_on_current_thread`]; [`block_on`] refuses to run there.

use std::cell::Cell;
use std::future::Future;

use tokio::runtime::Handle;

use crate::error::{DevSupportError, Result};

thread_local! {
    static BLOCKING_FORBIDDEN: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as one that must never block on network I/O.
pub fn forbid_blocking_on_current_thread() {
    BLOCKING_FORBIDDEN.with(|flag| flag.set(true));
}

/// Returns true if the current thread was marked as non-blocking.
pub fn is_blocking_forbidden() -> bool {
    BLOCKING_FORBIDDEN.with(Cell::get)
}

/// Runs `future` on `handle` and blocks the calling thread until it settles.
///
/// Must not be called on the UI thread. Fails with
/// [`DevSupportError::BlockedOnUiThread`] on a marked thread and with
/// [`DevSupportError::InsideAsyncRuntime`] from inside a Tokio context,
/// where blocking would stall a runtime worker.
pub fn block_on<F: Future>(handle: &Handle, future: F) -> Result<F::Output> {
    if is_blocking_forbidden() {
        return Err(DevSupportError::BlockedOnUiThread);
    }
    if Handle::try_current().is_ok() {
        return Err(DevSupportError::InsideAsyncRuntime);
    }
    Ok(handle.block_on(future))
}
