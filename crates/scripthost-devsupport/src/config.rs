//! Dev-support configuration and per-session settings.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable for the dev-server host.
pub const DEBUG_HOST_ENV: &str = "SCRIPTHOST_DEBUG_HOST";

/// Environment variable for the bundle name.
pub const BUNDLE_ENV: &str = "SCRIPTHOST_BUNDLE";

/// Environment variable for the bundle platform.
pub const PLATFORM_ENV: &str = "SCRIPTHOST_PLATFORM";

/// Default dev-server host.
pub const DEFAULT_DEBUG_HOST: &str = "localhost:8081";

/// Default bundle name.
pub const DEFAULT_BUNDLE: &str = "index";

/// Default bundle platform.
pub const DEFAULT_PLATFORM: &str = "windows";

/// Configuration for the dev-support client.
#[derive(Debug, Clone)]
pub struct DevSupportConfig {
    /// Pause after an ignorable poll error before the next long-poll.
    pub poll_error_backoff: Duration,
    /// Timeout for bundle and command downloads. Long-polls have none.
    pub fetch_timeout: Option<Duration>,
    /// Worker threads of the client-owned runtime.
    pub worker_threads: usize,
}

impl Default for DevSupportConfig {
    fn default() -> Self {
        Self {
            poll_error_backoff: Duration::from_millis(250),
            fetch_timeout: None,
            worker_threads: 2,
        }
    }
}

impl DevSupportConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll error backoff.
    pub fn with_poll_error_backoff(mut self, backoff: Duration) -> Self {
        self.poll_error_backoff = backoff;
        self
    }

    /// Sets the download timeout.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the number of runtime worker threads.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }
}

/// Callback fired by the proxy executor.
pub type DebuggerCallback = Arc<dyn Fn() + Send + Sync>;

/// Callbacks the proxy executor reports its state through.
#[derive(Clone, Default)]
pub struct DebuggerCallbacks {
    /// The connection failed or dropped.
    pub on_error: Option<DebuggerCallback>,
    /// Connected, waiting for a debugger to pick up the session.
    pub on_waiting_for_debugger: Option<DebuggerCallback>,
    /// A debugger attached.
    pub on_debugger_attached: Option<DebuggerCallback>,
}

impl DebuggerCallbacks {
    pub(crate) fn error(&self) {
        if let Some(cb) = &self.on_error {
            cb();
        }
    }

    pub(crate) fn waiting_for_debugger(&self) {
        if let Some(cb) = &self.on_waiting_for_debugger {
            cb();
        }
    }

    pub(crate) fn debugger_attached(&self) {
        if let Some(cb) = &self.on_debugger_attached {
            cb();
        }
    }
}

impl fmt::Debug for DebuggerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerCallbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_waiting_for_debugger", &self.on_waiting_for_debugger.is_some())
            .field("on_debugger_attached", &self.on_debugger_attached.is_some())
            .finish()
    }
}

/// Settings for one dev-support session.
#[derive(Debug, Clone)]
pub struct DevSettings {
    /// Dev-server host and port.
    pub debug_host: String,
    /// Bundle name without extension.
    pub bundle_name: String,
    /// Platform passed to the bundler.
    pub platform: String,
    /// Run script code in a remote debugger.
    pub use_web_debugger: bool,
    /// Reload when the dev server reports changes.
    pub use_live_reload: bool,
    /// Proxy executor callbacks.
    pub callbacks: DebuggerCallbacks,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            debug_host: DEFAULT_DEBUG_HOST.to_string(),
            bundle_name: DEFAULT_BUNDLE.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            use_web_debugger: false,
            use_live_reload: false,
            callbacks: DebuggerCallbacks::default(),
        }
    }
}

impl DevSettings {
    /// Creates settings for the given host.
    pub fn new(debug_host: impl Into<String>) -> Self {
        Self {
            debug_host: debug_host.into(),
            ..Self::default()
        }
    }

    /// Reads host, bundle and platform from the environment, falling back
    /// to defaults.
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Self {
            debug_host: var(DEBUG_HOST_ENV, DEFAULT_DEBUG_HOST),
            bundle_name: var(BUNDLE_ENV, DEFAULT_BUNDLE),
            platform: var(PLATFORM_ENV, DEFAULT_PLATFORM),
            ..Self::default()
        }
    }

    /// Sets the bundle name.
    pub fn with_bundle_name(mut self, bundle_name: impl Into<String>) -> Self {
        self.bundle_name = bundle_name.into();
        self
    }

    /// Sets the platform.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Sets the web debugger flag.
    pub fn with_web_debugger(mut self, enabled: bool) -> Self {
        self.use_web_debugger = enabled;
        self
    }

    /// Sets the live reload flag.
    pub fn with_live_reload(mut self, enabled: bool) -> Self {
        self.use_live_reload = enabled;
        self
    }

    /// Sets the proxy executor callbacks.
    pub fn with_callbacks(mut self, callbacks: DebuggerCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}
