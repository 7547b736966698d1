//! Error types for the dev-support crate.

use std::fmt;

use thiserror::Error;

/// Classification of a failed HTTP exchange, produced by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The server closed or corrupted the response. The dev server does this
    /// when it gives up on an idle long-poll.
    InvalidServerResponse,
    /// The request exceeded its deadline.
    TimedOut,
    /// The request was abandoned before it settled.
    Cancelled,
    /// No connection could be established.
    Connect,
    /// Anything else.
    Other,
}

impl TransportErrorKind {
    /// Returns true if a live-reload poll loop should keep going after this.
    pub fn is_ignorable_for_poll(self) -> bool {
        matches!(self, TransportErrorKind::InvalidServerResponse)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportErrorKind::InvalidServerResponse => "invalid server response",
            TransportErrorKind::TimedOut => "timed out",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// A transport-level failure with a typed kind.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Creates a new transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns the platform message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::TimedOut
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_body() || e.is_decode() || e.is_request() {
            TransportErrorKind::InvalidServerResponse
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, e.to_string())
    }
}

/// Errors that can occur in dev-support operations.
#[derive(Debug, Error)]
pub enum DevSupportError {
    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Platform failure re-raised with its message as text.
    #[error("{0}")]
    Platform(String),

    /// A blocking call was made on the UI thread.
    #[error("blocking dev-support call on the UI thread")]
    BlockedOnUiThread,

    /// A blocking call was made from inside an async runtime.
    #[error("blocking dev-support call inside an async runtime")]
    InsideAsyncRuntime,

    /// The proxy connection could not be established.
    #[error("proxy connect failed: {0}")]
    ProxyConnect(String),

    /// A frame was sent before the proxy connection was up.
    #[error("proxy executor is not connected")]
    ProxyNotConnected,

    /// The background runtime could not be built.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// Frame serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for dev-support operations.
pub type Result<T> = std::result::Result<T, DevSupportError>;
