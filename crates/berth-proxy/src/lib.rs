//! Berth Stream Proxy - forward TCP connections to a local Unix socket.
//!
//! Each accepted connection is paired with a fresh connection to the
//! endpoint and bytes are copied in both directions by two independent
//! tasks. When one side reaches EOF only the write half of the other side
//! is shut down, so replies still in flight are delivered.
//!
//! The main use is exposing a local X server (whose socket is named by
//! `DISPLAY`) to containers over TCP:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), berth_proxy::ProxyError> {
//! let socket = berth_proxy::display_socket_path(":0")?;
//! berth_proxy::start_proxy(berth_proxy::DEFAULT_X_PROXY_PORT, socket).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod display;
mod error;
#[cfg(unix)]
mod proxy;

pub use display::{DEFAULT_X_PROXY_PORT, X11_SOCKET_DIR, display_socket_path};
pub use error::{ProxyError, ProxyResult};
#[cfg(unix)]
pub use proxy::{ProxyConfig, StreamProxy, start_proxy};
