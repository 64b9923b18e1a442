//! `berth x`: expose the local X server to containers over TCP.

use anyhow::Result;
#[cfg(unix)]
use anyhow::Context;

#[cfg(unix)]
use crate::theme::Theme;

/// Forward `0.0.0.0:port` to the socket named by `display` until Ctrl-C.
#[cfg(unix)]
pub(crate) async fn run_x_proxy(port: u16, display: Option<String>) -> Result<()> {
    let display = display.context("DISPLAY is not set; pass --display or export DISPLAY")?;
    let socket = berth_proxy::display_socket_path(&display)?;

    println!("{}", Theme::header("X server proxy"));
    println!("{}", Theme::kv("Listening", &format!("0.0.0.0:{port}")));
    println!("{}", Theme::kv("Forwarding to", &socket.display().to_string()));
    println!(
        "{}",
        Theme::info(&format!(
            "Set DISPLAY=<host>:{} inside the container",
            port.saturating_sub(berth_proxy::DEFAULT_X_PROXY_PORT)
        ))
    );
    println!("{}", Theme::dimmed("Press Ctrl+C to stop"));

    berth_proxy::start_proxy(port, socket).await?;
    println!("{}", Theme::success("Proxy stopped"));
    Ok(())
}

/// The proxy forwards to a Unix socket and is unavailable elsewhere.
#[cfg(not(unix))]
pub(crate) async fn run_x_proxy(_port: u16, _display: Option<String>) -> Result<()> {
    anyhow::bail!("the X server proxy requires a Unix platform")
}
