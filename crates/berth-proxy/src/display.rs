//! X11 display socket resolution.

use std::path::{Path, PathBuf};

use crate::error::{ProxyError, ProxyResult};

/// Directory holding the local X11 server sockets.
pub const X11_SOCKET_DIR: &str = "/tmp/.X11-unix";

/// Default listen port for the X server proxy.
pub const DEFAULT_X_PROXY_PORT: u16 = 6000;

/// Map a `DISPLAY` value to the Unix socket of the local X server.
///
/// Absolute paths (XQuartz publishes a launchd socket path in `DISPLAY`)
/// are returned unchanged. `:N` and `:N.S` map to `/tmp/.X11-unix/XN`.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidDisplay`] for remote displays (`host:N`)
/// and anything else that does not name a local socket.
pub fn display_socket_path(display: &str) -> ProxyResult<PathBuf> {
    let display = display.trim();
    let path = Path::new(display);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let invalid = || ProxyError::InvalidDisplay(display.to_string());
    let rest = display.strip_prefix(':').ok_or_else(invalid)?;
    let number = rest.split_once('.').map_or(rest, |(n, _screen)| n);
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok(Path::new(X11_SOCKET_DIR).join(format!("X{number}")))
}
