//! Dev-support client.
//!
//! Wraps the dev server's HTTP/WebSocket surface in synchronous operations.
//! Every operation starts a new session by clearing the sticky exception
//! flag; any failure during the session sets it again. Callers learn about
//! failures through [`DevSupportClient::exception_caught`], not by parsing
//! returned text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

use crate::bridge;
use crate::config::{DevSettings, DevSupportConfig};
use crate::downloader::Downloader;
use crate::error::{DevSupportError, Result};
use crate::executor::{ExecutorDelegate, ProxyExecutor, WorkQueue};
use crate::poller::{LiveReloadPoller, OnChange, PollExit};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::urls::{DevServerUrls, PackagerUrls};

/// Builds a proxy executor once the engine supplies its delegate and queue.
///
/// Invoking the factory blocks until the proxy handshake settles, so it must
/// run off the UI thread.
pub type ExecutorFactory =
    Box<dyn FnOnce(Arc<dyn ExecutorDelegate>, Arc<dyn WorkQueue>) -> ProxyExecutor + Send>;

/// Client for bundle delivery, remote debugging and live reload.
pub struct DevSupportClient {
    handle: Handle,
    downloader: Downloader,
    urls: Arc<dyn DevServerUrls>,
    exception_flag: Arc<AtomicBool>,
    poller: LiveReloadPoller,
    /// Owned runtime, if the client was not given a handle. Declared last so
    /// it is dropped after the poller.
    runtime: Option<Runtime>,
}

impl DevSupportClient {
    /// Creates a client with the production transport and its own runtime.
    pub fn new(config: DevSupportConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::with_timeout(config.fetch_timeout));
        Self::with_parts(config, transport, Arc::new(PackagerUrls), None)
    }

    /// Creates a client from explicit parts.
    ///
    /// With `handle == None` the client builds and owns a multi-threaded
    /// runtime. An owned runtime must not be dropped from async context.
    pub fn with_parts(
        config: DevSupportConfig,
        transport: Arc<dyn HttpTransport>,
        urls: Arc<dyn DevServerUrls>,
        handle: Option<Handle>,
    ) -> Result<Self> {
        let (runtime, handle) = match handle {
            Some(h) => (None, h),
            None => {
                let rt = Builder::new_multi_thread()
                    .worker_threads(config.worker_threads)
                    .thread_name("devsupport")
                    .enable_all()
                    .build()?;
                let h = rt.handle().clone();
                (Some(rt), h)
            }
        };

        let exception_flag = Arc::new(AtomicBool::new(false));
        let poller = LiveReloadPoller::new(
            Arc::clone(&transport),
            handle.clone(),
            Arc::clone(&exception_flag),
            config.poll_error_backoff,
        );

        Ok(Self {
            handle,
            downloader: Downloader::new(transport),
            urls,
            exception_flag,
            poller,
            runtime,
        })
    }

    /// Returns the runtime handle network work runs on.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Whether the most recent session failed.
    pub fn exception_caught(&self) -> bool {
        self.exception_flag.load(Ordering::SeqCst)
    }

    fn begin_session(&self) {
        self.exception_flag.store(false, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        self.exception_flag.store(true, Ordering::SeqCst);
    }

    /// Asks the dev server to open the debugger UI. Blocks.
    pub fn launch_dev_tools(&self, debug_host: &str) -> Result<()> {
        self.begin_session();
        self.request_dev_tools(debug_host)
    }

    fn request_dev_tools(&self, debug_host: &str) -> Result<()> {
        let url = self.urls.launch_dev_tools_command_url(debug_host);
        match bridge::block_on(&self.handle, self.downloader.fetch(&url)) {
            Ok(Ok(download)) => {
                debug!(url = %url, status = download.status, "dev tools launch requested");
                Ok(())
            }
            Ok(Err(e)) => {
                self.record_failure();
                Err(DevSupportError::Platform(e.message().to_string()))
            }
            Err(e) => {
                self.record_failure();
                Err(e)
            }
        }
    }

    /// Launches dev tools and returns a factory for the proxy executor.
    ///
    /// The factory is not run here. When it runs it connects to the
    /// WebSocket proxy, sets the exception flag if that fails, and returns
    /// the executor either way.
    pub fn load_javascript_in_proxy_mode(&self, settings: &DevSettings) -> Result<ExecutorFactory> {
        self.begin_session();
        self.request_dev_tools(&settings.debug_host)?;

        let url = self.urls.websocket_proxy_url(&settings.debug_host);
        let handle = self.handle.clone();
        let flag = Arc::clone(&self.exception_flag);
        let callbacks = settings.callbacks.clone();

        Ok(Box::new(move |delegate, queue| {
            let executor = ProxyExecutor::new(delegate, queue, callbacks);
            match bridge::block_on(&handle, executor.connect(&url)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) | Err(e) => {
                    warn!(url = %url, error = %e, "proxy executor not connected");
                    flag.store(true, Ordering::SeqCst);
                }
            }
            executor
        }))
    }

    /// Downloads the development bundle. Blocks.
    ///
    /// Returns the bundle source, the server's error text, or
    /// `"Error:<message>"` when the request itself failed.
    pub fn get_javascript_from_server(
        &self,
        debug_host: &str,
        bundle_name: &str,
        platform: &str,
    ) -> String {
        self.begin_session();
        let url = self
            .urls
            .bundle_url(debug_host, bundle_name, platform, true, false);

        match bridge::block_on(&self.handle, self.downloader.fetch(&url)) {
            Ok(Ok(download)) => {
                if !download.success {
                    warn!(url = %url, status = download.status, "bundle download failed");
                    self.record_failure();
                } else {
                    info!(url = %url, bytes = download.text.len(), "bundle downloaded");
                }
                download.text
            }
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "bundle request failed");
                self.record_failure();
                format!("Error:{}", e.message())
            }
            Err(e) => {
                warn!(url = %url, error = %e, "bundle request refused");
                self.record_failure();
                format!("Error:{}", e)
            }
        }
    }

    /// Downloads the bundle named by `settings`. See
    /// [`get_javascript_from_server`](Self::get_javascript_from_server).
    pub fn get_javascript(&self, settings: &DevSettings) -> String {
        self.get_javascript_from_server(
            &settings.debug_host,
            &settings.bundle_name,
            &settings.platform,
        )
    }

    /// Starts live reload for `settings.debug_host` if the settings enable
    /// it, otherwise stops any running loop. Returns whether a loop started.
    pub fn apply_live_reload(&self, settings: &DevSettings, on_change: OnChange) -> bool {
        if settings.use_live_reload {
            self.start_polling_live_reload(&settings.debug_host, on_change);
            true
        } else {
            self.stop_polling_live_reload();
            false
        }
    }

    /// Starts the live-reload loop for `debug_host`.
    pub fn start_polling_live_reload(&self, debug_host: &str, on_change: OnChange) {
        let url = self.urls.on_change_endpoint_url(debug_host);
        info!(url = %url, "starting live reload");
        self.poller.start(url, on_change);
    }

    /// Stops the live-reload loop without waiting for it.
    pub fn stop_polling_live_reload(&self) {
        self.poller.stop();
    }

    /// Returns true while a live-reload loop is running.
    pub fn is_polling_live_reload(&self) -> bool {
        self.poller.is_polling()
    }

    /// Why the last live-reload loop ended, or `None` while it runs.
    pub fn live_reload_exit(&self) -> Option<PollExit> {
        self.poller.last_exit()
    }
}

impl Drop for DevSupportClient {
    fn drop(&mut self) {
        self.stop_polling_live_reload();
        if self.runtime.is_some() {
            debug!("shutting down dev-support runtime");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use crate::executor::{ProxyState, Task};
    use crate::testing::{wait_until, ScriptedTransport, Step};
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct NullDelegate;

    impl ExecutorDelegate for NullDelegate {
        fn on_frame(&self, _frame: serde_json::Value) {}
    }

    struct InlineQueue;

    impl WorkQueue for InlineQueue {
        fn run_on_queue(&self, task: Task) {
            task();
        }
    }

    fn client(steps: Vec<Step>) -> (DevSupportClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(steps));
        let config = DevSupportConfig::new()
            .with_poll_error_backoff(Duration::ZERO)
            .with_worker_threads(1);
        let client =
            DevSupportClient::with_parts(config, transport.clone(), Arc::new(PackagerUrls), None)
                .unwrap();
        (client, transport)
    }

    #[test]
    fn test_get_javascript_success() {
        let (client, transport) = client(vec![Step::respond(200, "__d(function(){})")]);

        let source = client.get_javascript_from_server("localhost:8081", "index", "windows");

        assert_eq!(source, "__d(function(){})");
        assert!(!client.exception_caught());
        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:8081/index.bundle?platform=windows&dev=true&hot=false"
        );
    }

    #[test]
    fn test_get_javascript_http_failure_sets_flag() {
        let (client, _) = client(vec![Step::respond(500, "")]);

        let source = client.get_javascript_from_server("localhost:8081", "index", "windows");

        assert_eq!(
            source,
            "HTTP Error 500 downloading http://localhost:8081/index.bundle?platform=windows&dev=true&hot=false"
        );
        assert!(client.exception_caught());
    }

    #[test]
    fn test_get_javascript_platform_error() {
        let (client, _) = client(vec![Step::fail(
            TransportErrorKind::Connect,
            "No connection could be made",
        )]);

        let source = client.get_javascript_from_server("localhost:8081", "index", "windows");

        assert_eq!(source, "Error:No connection could be made");
        assert!(client.exception_caught());
    }

    #[test]
    fn test_new_session_resets_flag() {
        let (client, _) = client(vec![Step::respond(404, ""), Step::respond(200, "ok")]);

        client.get_javascript_from_server("h", "index", "windows");
        assert!(client.exception_caught());

        client.get_javascript_from_server("h", "index", "windows");
        assert!(!client.exception_caught());
    }

    #[test]
    fn test_blocking_on_ui_thread_is_refused() {
        let (client, transport) = client(vec![Step::respond(200, "unused")]);
        let client = Arc::new(client);

        let c = Arc::clone(&client);
        let source = std::thread::spawn(move || {
            bridge::forbid_blocking_on_current_thread();
            c.get_javascript_from_server("h", "index", "windows")
        })
        .join()
        .unwrap();

        assert!(source.starts_with("Error:"));
        assert!(client.exception_caught());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_launch_dev_tools_ignores_body() {
        let (client, transport) = client(vec![Step::respond(404, "")]);

        client.launch_dev_tools("localhost:8081").unwrap();

        assert!(!client.exception_caught());
        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:8081/launch-js-devtools"
        );
    }

    #[test]
    fn test_proxy_mode_launch_failure_is_reraised() {
        let (client, _) = client(vec![Step::fail(TransportErrorKind::Other, "host not found")]);

        let result = client.load_javascript_in_proxy_mode(&DevSettings::new("nowhere:8081"));

        match result {
            Err(DevSupportError::Platform(message)) => assert_eq!(message, "host not found"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected failure"),
        }
        assert!(client.exception_caught());
    }

    #[test]
    fn test_proxy_factory_returns_unconnected_executor() {
        let (client, _) = client(vec![Step::respond(200, "OK")]);
        let settings = DevSettings::new("127.0.0.1:1");

        let factory = client.load_javascript_in_proxy_mode(&settings).unwrap();
        assert!(!client.exception_caught());

        let executor = factory(Arc::new(NullDelegate), Arc::new(InlineQueue));

        assert!(matches!(executor.state(), ProxyState::Failed(_)));
        assert!(client.exception_caught());
    }

    #[test]
    fn test_live_reload_through_client() {
        let (client, transport) = client(vec![Step::respond(200, ""), Step::respond(205, "")]);
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);

        client.start_polling_live_reload(
            "localhost:8081",
            Arc::new(move || {
                let _ = tx.lock().unwrap().send(());
            }),
        );

        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(client.is_polling_live_reload());
        assert_eq!(transport.requests()[0].url, "http://localhost:8081/onchange");

        client.stop_polling_live_reload();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(wait_until(Duration::from_secs(2), || transport.request_count() >= 2));
    }

    #[test]
    fn test_change_callback_can_fetch_bundle() {
        let (client, transport) = client(vec![
            Step::respond(205, ""),
            Step::respond(200, "__d(function(){})"),
        ]);
        let client = Arc::new(client);
        let weak = Arc::downgrade(&client);
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);

        client.start_polling_live_reload(
            "localhost:8081",
            Arc::new(move || {
                if let Some(client) = weak.upgrade() {
                    let source =
                        client.get_javascript_from_server("localhost:8081", "index", "windows");
                    let _ = tx.lock().unwrap().send((source, client.exception_caught()));
                }
            }),
        );

        let (source, failed) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        client.stop_polling_live_reload();

        assert_eq!(source, "__d(function(){})");
        assert!(!failed);
        assert_eq!(
            transport.requests()[1].url,
            "http://localhost:8081/index.bundle?platform=windows&dev=true&hot=false"
        );
    }

    #[test]
    fn test_get_javascript_uses_settings() {
        let (client, transport) = client(vec![Step::respond(200, "ok")]);
        let settings = DevSettings::new("devbox:8081")
            .with_bundle_name("main")
            .with_platform("android");

        assert_eq!(client.get_javascript(&settings), "ok");
        assert_eq!(
            transport.requests()[0].url,
            "http://devbox:8081/main.bundle?platform=android&dev=true&hot=false"
        );
    }

    #[test]
    fn test_apply_live_reload_follows_setting() {
        let (client, transport) = client(vec![]);
        let settings = DevSettings::new("localhost:8081");

        assert!(!client.apply_live_reload(&settings, Arc::new(|| {})));
        assert!(!client.is_polling_live_reload());
        assert_eq!(transport.request_count(), 0);

        let settings = settings.with_live_reload(true);
        assert!(client.apply_live_reload(&settings, Arc::new(|| {})));
        assert!(wait_until(Duration::from_secs(2), || transport.request_count() == 1));
        assert!(client.is_polling_live_reload());

        let settings = settings.with_live_reload(false);
        assert!(!client.apply_live_reload(&settings, Arc::new(|| {})));
        assert!(client.is_polling_live_reload(), "stop does not wait for the poll");
    }

    #[test]
    fn test_live_reload_exit_after_failure() {
        let (client, _) = client(vec![Step::fail(TransportErrorKind::Connect, "refused")]);
        assert!(client.live_reload_exit().is_none());

        client.start_polling_live_reload("localhost:8081", Arc::new(|| {}));

        assert!(wait_until(Duration::from_secs(2), || !client.is_polling_live_reload()));
        assert!(matches!(client.live_reload_exit(), Some(PollExit::Failed(_))));
        assert!(client.exception_caught());
    }
}
