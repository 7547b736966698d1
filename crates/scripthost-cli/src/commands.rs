//! Command handlers for CLI subcommands.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use scripthost_devsupport::{
    DebuggerCallbacks, DevSettings, DevSupportClient, DevSupportError, ExecutorDelegate, PollExit,
    Task, WorkQueue,
};

use crate::cli::Commands;

/// How often `watch` checks whether the poll loop is still running.
const WATCH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    DevSupport(#[from] DevSupportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bundle download failed: {0}")]
    Bundle(String),

    #[error("live reload stopped after a dev-server error")]
    LiveReloadStopped,

    #[error("debugger proxy not connected")]
    ProxyNotConnected,
}

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Execute a CLI command.
pub fn execute(client: &DevSupportClient, command: Commands, host: &str) -> Result<()> {
    match command {
        Commands::Bundle {
            bundle,
            platform,
            out,
        } => {
            let settings = DevSettings::new(host)
                .with_bundle_name(bundle)
                .with_platform(platform);
            cmd_bundle(client, &settings, out.as_deref())
        }
        Commands::LaunchDevtools => cmd_launch_devtools(client, host),
        Commands::Watch => cmd_watch(client, host),
        Commands::Proxy => cmd_proxy(client, host),
    }
}

fn cmd_bundle(client: &DevSupportClient, settings: &DevSettings, out: Option<&Path>) -> Result<()> {
    let source = client.get_javascript(settings);
    if client.exception_caught() {
        return Err(CliError::Bundle(source));
    }

    match out {
        Some(path) => {
            write_bundle(path, &source)?;
            println!("Wrote {} bytes to {}", source.len(), path.display());
        }
        None => println!("{}", source),
    }
    Ok(())
}

fn write_bundle(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, source)?;
    info!(path = %path.display(), bytes = source.len(), "bundle written");
    Ok(())
}

fn cmd_launch_devtools(client: &DevSupportClient, host: &str) -> Result<()> {
    client.launch_dev_tools(host)?;
    println!("Requested dev tools from {}", host);
    Ok(())
}

fn cmd_watch(client: &DevSupportClient, host: &str) -> Result<()> {
    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let source = host.to_string();
    let settings = DevSettings::new(host).with_live_reload(true);

    client.apply_live_reload(
        &settings,
        Arc::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[{}] change #{}", source, n);
        }),
    );
    println!("Watching {} for changes (Ctrl+C to stop)", host);

    let interrupted = client.handle().block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ticker = tokio::time::interval(WATCH_CHECK_INTERVAL);
        loop {
            tokio::select! {
                res = &mut ctrl_c => return res.map(|_| true),
                _ = ticker.tick() => {
                    if !client.is_polling_live_reload() {
                        return Ok(false);
                    }
                }
            }
        }
    })?;
    client.stop_polling_live_reload();

    println!("{} change(s) seen", changes.load(Ordering::SeqCst));
    if interrupted {
        return Ok(());
    }
    match client.live_reload_exit() {
        Some(PollExit::Failed(e)) => Err(DevSupportError::from(e).into()),
        _ if client.exception_caught() => Err(CliError::LiveReloadStopped),
        _ => Ok(()),
    }
}

/// Prints frames the debugger sends.
struct PrintDelegate;

impl ExecutorDelegate for PrintDelegate {
    fn on_frame(&self, frame: Value) {
        println!("{}", frame);
    }
}

/// Runs delegate work on the socket task itself.
struct InlineQueue;

impl WorkQueue for InlineQueue {
    fn run_on_queue(&self, task: Task) {
        task();
    }
}

fn cmd_proxy(client: &DevSupportClient, host: &str) -> Result<()> {
    let settings = DevSettings::new(host)
        .with_web_debugger(true)
        .with_callbacks(DebuggerCallbacks {
            on_error: Some(Arc::new(|| eprintln!("Debugger connection lost"))),
            on_waiting_for_debugger: Some(Arc::new(|| println!("Waiting for debugger..."))),
            on_debugger_attached: Some(Arc::new(|| println!("Debugger attached"))),
        });

    let factory = client.load_javascript_in_proxy_mode(&settings)?;
    let executor = factory(Arc::new(PrintDelegate), Arc::new(InlineQueue));
    println!("Proxy state: {:?}", executor.state());

    if client.exception_caught() {
        warn!(host = %host, "proxy executor failed to connect");
        return Err(CliError::ProxyNotConnected);
    }

    client.handle().block_on(tokio::signal::ctrl_c())?;
    executor.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripthost_devsupport::{DevSupportConfig, TransportErrorKind};
    use tempfile::tempdir;

    fn client() -> DevSupportClient {
        DevSupportClient::new(DevSupportConfig::new().with_worker_threads(1)).unwrap()
    }

    #[test]
    fn test_bundle_unreachable_host_fails() {
        let client = client();
        let dir = tempdir().unwrap();
        let out = dir.path().join("index.js");

        let settings = DevSettings::new("127.0.0.1:1");

        let result = cmd_bundle(&client, &settings, Some(&out));

        match result {
            Err(CliError::Bundle(text)) => assert!(text.starts_with("Error:")),
            other => panic!("Expected bundle error, got {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_launch_devtools_unreachable_host_fails() {
        let client = client();

        let result = cmd_launch_devtools(&client, "127.0.0.1:1");

        assert!(matches!(
            result,
            Err(CliError::DevSupport(DevSupportError::Platform(_)))
        ));
        assert!(client.exception_caught());
    }

    #[test]
    fn test_watch_returns_when_poll_fails() {
        let client = client();

        let result = cmd_watch(&client, "127.0.0.1:1");

        match result {
            Err(CliError::DevSupport(DevSupportError::Transport(e))) => {
                assert_eq!(e.kind(), TransportErrorKind::Connect)
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
        assert!(!client.is_polling_live_reload());
        assert!(client.exception_caught());
    }

    #[test]
    fn test_write_bundle_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("index.bundle.js");

        write_bundle(&path, "__d(function(){});").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "__d(function(){});"
        );
    }
}
