//! Dev-server endpoint URLs.

/// Builds dev-server endpoint URLs from a debug host such as `localhost:8081`.
pub trait DevServerUrls: Send + Sync {
    /// Endpoint that asks the dev server to open the debugger UI.
    fn launch_dev_tools_command_url(&self, debug_host: &str) -> String;

    /// WebSocket endpoint of the debugger proxy.
    fn websocket_proxy_url(&self, debug_host: &str) -> String;

    /// Long-poll endpoint answered with 205 when sources change.
    fn on_change_endpoint_url(&self, debug_host: &str) -> String;

    /// Bundle download URL.
    fn bundle_url(
        &self,
        debug_host: &str,
        bundle_name: &str,
        platform: &str,
        dev: bool,
        hot: bool,
    ) -> String;
}

/// URL layout of the standard bundler/packager.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackagerUrls;

impl DevServerUrls for PackagerUrls {
    fn launch_dev_tools_command_url(&self, debug_host: &str) -> String {
        format!("http://{}/launch-js-devtools", debug_host)
    }

    fn websocket_proxy_url(&self, debug_host: &str) -> String {
        format!("ws://{}/debugger-proxy?role=client", debug_host)
    }

    fn on_change_endpoint_url(&self, debug_host: &str) -> String {
        format!("http://{}/onchange", debug_host)
    }

    fn bundle_url(
        &self,
        debug_host: &str,
        bundle_name: &str,
        platform: &str,
        dev: bool,
        hot: bool,
    ) -> String {
        format!(
            "http://{}/{}.bundle?platform={}&dev={}&hot={}",
            debug_host, bundle_name, platform, dev, hot
        )
    }
}
