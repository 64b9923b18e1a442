//! `watch`: re-runs a sync command whenever watched files change.
//!
//! ```text
//! run command once
//!   → filesystem events (notify)
//!   → drop access-only events and excluded paths
//!   → debounce
//!   → run command again
//! ```
//!
//! The initial run must succeed; later failures are reported and watching
//! continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use berth_core::{Pluggable, PluginContext, PluginError, PluginResult, Syncable};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exec;
use crate::params::PluginParams;
use crate::registry::PluginRegistry;

/// Registry name.
pub const NAME: &str = "watch";

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Manifest parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchParams {
    /// Paths to watch recursively.
    pub paths: Vec<PathBuf>,
    /// Sync command argv.
    pub command: Vec<String>,
    /// Regexes matched against changed paths; matches are ignored.
    pub exclude: Vec<String>,
    /// Quiet period before re-running the command.
    pub debounce_ms: u64,
}

impl Default for WatchParams {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            command: Vec::new(),
            exclude: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Register the `watch` factory.
///
/// # Errors
///
/// Returns an error if the name is already taken.
pub fn register(registry: &mut PluginRegistry) -> PluginResult<()> {
    registry.register(NAME, |params| {
        Ok(Box::new(WatchPlugin::from_params(params)?) as Box<dyn Pluggable>)
    })
}

/// File-watching sync plugin.
#[derive(Debug)]
pub struct WatchPlugin {
    params: WatchParams,
    exclude: Vec<Regex>,
    stopped: CancellationToken,
    ctx: Option<Arc<PluginContext>>,
}

impl WatchPlugin {
    /// Create the plugin from manifest parameters.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidParameters`] if the map does not fit
    /// [`WatchParams`], the command is empty, or an exclude pattern is not a
    /// valid regex.
    pub fn from_params(params: &PluginParams) -> PluginResult<Self> {
        let parsed: WatchParams = params.deserialize()?;
        if parsed.command.is_empty() {
            return Err(params.invalid("`command` must name a program to run"));
        }
        if parsed.paths.is_empty() {
            return Err(params.invalid("`paths` must not be empty"));
        }
        let exclude = parsed
            .exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| params.invalid(format!("exclude `{pattern}`: {e}")))
            })
            .collect::<PluginResult<Vec<_>>>()?;

        Ok(Self {
            params: parsed,
            exclude,
            stopped: CancellationToken::new(),
            ctx: None,
        })
    }

    fn ctx(&self) -> PluginResult<&PluginContext> {
        self.ctx
            .as_deref()
            .ok_or_else(|| PluginError::NotConfigured(NAME.to_string()))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.exclude.iter().any(|re| re.is_match(&text))
    }

    /// Whether a raw event should schedule a re-run.
    fn is_relevant(&self, event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) && event.paths.iter().any(|p| !self.is_excluded(p))
    }

    async fn run_command(&self, cancel: &CancellationToken) -> PluginResult<()> {
        let (program, args) = self
            .params
            .command
            .split_first()
            .ok_or_else(|| PluginError::NotConfigured(NAME.to_string()))?;
        exec::run_until_cancelled(exec::command(program, args), cancel).await
    }

    fn start_watcher(
        &self,
    ) -> PluginResult<(RecommendedWatcher, mpsc::UnboundedReceiver<notify::Result<Event>>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| PluginError::ExecutionFailed(format!("filesystem watcher: {e}")))?;

        for path in &self.params.paths {
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => info!(plugin = NAME, path = %path.display(), "Watching"),
                Err(e) => warn!(
                    plugin = NAME,
                    path = %path.display(),
                    error = %e,
                    "Failed to watch path, skipping"
                ),
            }
        }
        Ok((watcher, raw_rx))
    }
}

#[async_trait]
impl Pluggable for WatchPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, ctx: Arc<PluginContext>) {
        self.ctx = Some(ctx);
    }

    async fn teardown(&self) -> PluginResult<()> {
        self.stopped.cancel();
        Ok(())
    }

    fn as_syncable(&self) -> Option<&dyn Syncable> {
        Some(self)
    }
}

#[async_trait]
impl Syncable for WatchPlugin {
    async fn sync(&self, cancel: CancellationToken) -> PluginResult<()> {
        let ui = Arc::clone(&self.ctx()?.ui);
        // Either the run being cancelled or this plugin being torn down ends the loop.
        let stop = cancel.child_token();
        let _stop_on_exit = stop.clone().drop_guard();
        {
            let stopped = self.stopped.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = stopped.cancelled() => stop.cancel(),
                    () = stop.cancelled() => {}
                }
            });
        }

        ui.stage("Sync");
        ui.step(&format!("Initial sync: {}", self.params.command.join(" ")));
        self.run_command(&stop).await?;

        // Dropping the watcher stops filesystem monitoring.
        let (_watcher, mut raw_rx) = self.start_watcher()?;
        let debounce = Duration::from_millis(self.params.debounce_ms);
        let mut deadline: Option<tokio::time::Instant> = None;

        loop {
            tokio::select! {
                biased;

                () = stop.cancelled() => {
                    debug!(plugin = NAME, "Watch loop stopped");
                    return Ok(());
                }

                () = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    deadline = None;
                    ui.step("Change detected, syncing");
                    if let Err(e) = self.run_command(&stop).await {
                        warn!(plugin = NAME, error = %e, "Sync command failed");
                        ui.warn(&format!("sync failed: {e}"));
                    }
                }

                event = raw_rx.recv() => match event {
                    Some(Ok(ev)) if self.is_relevant(&ev) => {
                        debug!(plugin = NAME, paths = ?ev.paths, kind = ?ev.kind, "File change");
                        #[allow(clippy::arithmetic_side_effects)]
                        // Instant + Duration cannot overflow in practice
                        let at = tokio::time::Instant::now() + debounce;
                        deadline = Some(at);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!(plugin = NAME, error = %e, "Filesystem watcher error"),
                    None => {
                        return Err(PluginError::ExecutionFailed(
                            "filesystem watcher stopped unexpectedly".to_string(),
                        ));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: serde_json::Value) -> PluginParams {
        PluginParams::new(NAME, value)
    }

    #[test]
    fn defaults_apply() {
        let plugin = WatchPlugin::from_params(&params(serde_json::json!({"command": ["true"]}))).unwrap();
        assert_eq!(plugin.params.paths, vec![PathBuf::from(".")]);
        assert_eq!(plugin.params.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(plugin.exclude.is_empty());
    }

    #[test]
    fn command_is_required() {
        let err = WatchPlugin::from_params(&params(serde_json::Value::Null)).unwrap_err();
        assert!(matches!(err, PluginError::InvalidParameters { .. }));
    }

    #[test]
    fn bad_exclude_pattern_rejected() {
        let err = WatchPlugin::from_params(&params(
            serde_json::json!({"command": ["true"], "exclude": ["("]}),
        ))
        .unwrap_err();
        assert!(matches!(err, PluginError::InvalidParameters { message, .. } if message.contains("exclude")));
    }

    #[test]
    fn excluded_paths_are_not_relevant() {
        let plugin = WatchPlugin::from_params(&params(
            serde_json::json!({"command": ["true"], "exclude": ["\\.git/", "~$"]}),
        ))
        .unwrap();

        let event = |path: &str| {
            Event::new(EventKind::Modify(notify::event::ModifyKind::Any)).add_path(PathBuf::from(path))
        };
        assert!(plugin.is_relevant(&event("src/main.rs")));
        assert!(!plugin.is_relevant(&event("repo/.git/index")));
        assert!(!plugin.is_relevant(&event("notes.txt~")));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("src/main.rs"));
        assert!(!plugin.is_relevant(&access));
    }

    #[test]
    fn declares_sync_only() {
        let plugin = WatchPlugin::from_params(&params(serde_json::json!({"command": ["true"]}))).unwrap();
        assert_eq!(plugin.capabilities().to_string(), "sync");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn initial_run_then_stops_on_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let mut plugin = WatchPlugin::from_params(&params(serde_json::json!({
            "paths": [dir.path()],
            "command": ["touch", marker],
        })))
        .unwrap();
        plugin.configure(Arc::new(PluginContext::headless("demo")));
        let plugin = Arc::new(plugin);

        let task = {
            let plugin = Arc::clone(&plugin);
            tokio::spawn(async move { plugin.sync(CancellationToken::new()).await })
        };

        for _ in 0..50 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(marker.exists(), "initial sync should have run");

        plugin.teardown().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("sync should return after teardown")
            .unwrap();
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_initial_run_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut plugin = WatchPlugin::from_params(&params(serde_json::json!({
            "paths": [dir.path()],
            "command": ["false"],
        })))
        .unwrap();
        plugin.configure(Arc::new(PluginContext::headless("demo")));

        let err = plugin.sync(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PluginError::CommandFailed { .. }));
    }
}
