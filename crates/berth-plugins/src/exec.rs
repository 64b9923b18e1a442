//! Child process helpers shared by the built-in plugins.

use std::ffi::OsStr;
use std::process::Stdio;

use berth_core::{PluginError, PluginResult};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Build a command from a program and its arguments.
pub(crate) fn command<S: AsRef<OsStr>>(program: impl AsRef<OsStr>, args: &[S]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.kill_on_drop(true);
    cmd
}

/// Render a command line for logs and error messages.
pub(crate) fn describe(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    std::iter::once(std_cmd.get_program())
        .chain(std_cmd.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn_failed(line: &str, e: &std::io::Error) -> PluginError {
    PluginError::ExecutionFailed(format!("failed to start `{line}`: {e}"))
}

/// Run to completion with inherited stdio.
///
/// # Errors
///
/// Returns [`PluginError::CommandFailed`] on a non-zero exit.
pub(crate) async fn run(mut cmd: Command) -> PluginResult<()> {
    let line = describe(&cmd);
    debug!(command = %line, "Running command");

    let status = cmd.status().await.map_err(|e| spawn_failed(&line, &e))?;
    if status.success() {
        Ok(())
    } else {
        Err(PluginError::CommandFailed {
            command: line,
            status: status.to_string(),
        })
    }
}

/// Run with output discarded and report whether it exited successfully.
pub(crate) async fn succeeds(mut cmd: Command) -> PluginResult<bool> {
    let line = describe(&cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = cmd.status().await.map_err(|e| spawn_failed(&line, &e))?;
    debug!(command = %line, success = status.success(), "Check finished");
    Ok(status.success())
}

/// Run until the child exits or `cancel` fires.
///
/// On cancellation the child is killed and reaped, and the call returns
/// `Ok`.
///
/// # Errors
///
/// Returns [`PluginError::CommandFailed`] if the child exits unsuccessfully
/// before cancellation.
pub(crate) async fn run_until_cancelled(
    mut cmd: Command,
    cancel: &CancellationToken,
) -> PluginResult<()> {
    let line = describe(&cmd);
    let mut child = cmd.spawn().map_err(|e| spawn_failed(&line, &e))?;
    debug!(command = %line, pid = ?child.id(), "Spawned command");

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            if status.success() {
                Ok(())
            } else {
                Err(PluginError::CommandFailed { command: line, status: status.to_string() })
            }
        }
        () = cancel.cancelled() => {
            info!(command = %line, "Cancelled, stopping command");
            child.kill().await?;
            Ok(())
        }
    }
}
