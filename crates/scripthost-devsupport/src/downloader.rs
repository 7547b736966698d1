//! One-shot bundle/command downloads.

use std::sync::Arc;

use tracing::debug;

use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpTransport};

/// Result of a [`Downloader::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Body text, or a synthesized message for empty failed responses.
    pub text: String,
    /// Whether the response carried a success status.
    pub success: bool,
    /// HTTP status code.
    pub status: u16,
}

/// Performs uncached GET requests against the dev server.
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn HttpTransport>,
}

impl Downloader {
    /// Creates a downloader over the given transport.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetches `url` with caching disabled.
    ///
    /// A failed response with an empty body yields
    /// `"HTTP Error <code> downloading <url>"` as its text.
    pub async fn fetch(&self, url: &str) -> Result<Download, TransportError> {
        let request = HttpRequest::get(url).with_no_cache(true);
        let response = self.transport.get(request).await?;
        let success = response.is_success();

        let text = if response.body.is_empty() && !success {
            format!("HTTP Error {} downloading {}", response.status, url)
        } else {
            response.body
        };

        debug!(url = %url, status = response.status, success, "download finished");

        Ok(Download {
            text,
            success,
            status: response.status,
        })
    }
}
