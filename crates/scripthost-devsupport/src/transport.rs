//! HTTP transport seam.
//!
//! Everything that talks to the dev server goes through [`HttpTransport`],
//! so the poll loop and the client can be driven by a scripted transport in
//! tests and by [`ReqwestTransport`] in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONNECTION, PRAGMA};
use tracing::trace;

use crate::error::TransportError;

/// A single GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL.
    pub url: String,
    /// Send `Connection: keep-alive`.
    pub keep_alive: bool,
    /// Disable any caching between client and server.
    pub no_cache: bool,
    /// Read the response body. Long-polls only need the status.
    pub read_body: bool,
}

impl HttpRequest {
    /// A plain GET that reads the body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            keep_alive: false,
            no_cache: false,
            read_body: true,
        }
    }

    /// Sets the keep-alive flag.
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the no-cache flag.
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Sets whether the body is read.
    pub fn with_read_body(mut self, read_body: bool) -> Self {
        self.read_body = read_body;
        self
    }
}

/// The settled response of an [`HttpRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body text, empty when not read.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues HTTP GET requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs the request and waits for it to settle.
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Creates a transport with no request timeout.
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Creates a transport applying `timeout` to body-reading requests.
    ///
    /// Long-polls never get a timeout; the server decides when to answer.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn headers(request: &HttpRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if request.keep_alive {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }
        if request.no_cache {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }
        headers
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!(url = %request.url, keep_alive = request.keep_alive, "http get");

        let mut builder = self
            .client
            .get(&request.url)
            .headers(Self::headers(&request));
        if let (true, Some(timeout)) = (request.read_body, self.timeout) {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = if request.read_body {
            response.text().await?
        } else {
            String::new()
        };

        Ok(HttpResponse { status, body })
    }
}
