//! Development-server support for scripthost.
//!
//! This crate talks to an external development server:
//! - `Downloader` - uncached one-shot GETs for bundles and commands
//! - `LiveReloadPoller` - cancellable long-poll loop on the change endpoint
//! - `ProxyExecutor` - WebSocket connection to a remote debugger
//! - `DevSupportClient` - synchronous entry point combining the above
//!
//! # Example
//!
//! ```no_run
//! use scripthost_devsupport::{DevSupportClient, DevSupportConfig};
//! use std::sync::Arc;
//!
//! let client = DevSupportClient::new(DevSupportConfig::default())?;
//!
//! let source = client.get_javascript_from_server("localhost:8081", "index", "windows");
//! if client.exception_caught() {
//!     eprintln!("bundle failed: {}", source);
//! }
//!
//! client.start_polling_live_reload("localhost:8081", Arc::new(|| println!("changed")));
//! # Ok::<(), scripthost_devsupport::DevSupportError>(())
//! ```
//!
//! # Threading
//!
//! The public operations of `DevSupportClient` block the calling thread
//! until the network call settles. Call them from background threads only;
//! threads marked with `bridge::forbid_blocking_on_current_thread` (the UI
//! thread) get an error instead of a stall. Live-reload callbacks run on a
//! plain thread of their own and may call them.

pub mod bridge;
pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod executor;
pub mod poller;
pub mod transport;
pub mod urls;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{DevSupportClient, ExecutorFactory};
pub use config::{DebuggerCallback, DebuggerCallbacks, DevSettings, DevSupportConfig};
pub use downloader::{Download, Downloader};
pub use error::{DevSupportError, Result, TransportError, TransportErrorKind};
pub use executor::{ExecutorDelegate, ProxyExecutor, ProxyState, Task, WorkQueue};
pub use poller::{LiveReloadPoller, OnChange, PollExit, RESET_CONTENT};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use urls::{DevServerUrls, PackagerUrls};
