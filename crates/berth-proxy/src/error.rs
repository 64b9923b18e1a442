//! Proxy error types.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors that stop the proxy as a whole.
///
/// Per-connection failures never surface here; they are logged and only
/// that connection is dropped.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The TCP listener could not be bound.
    #[error("failed to bind proxy listener on {addr}: {source}")]
    Bind {
        /// The requested listen address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A `DISPLAY` value that does not name a local socket.
    #[error("cannot map DISPLAY '{0}' to a local socket")]
    InvalidDisplay(String),

    /// Other I/O failures on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
