//! Execution driver: starts long-running plugin tasks and waits for the
//! first failure or the shutdown signal.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use berth_core::{Category, Pluggable, PluginError, PluginResult};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::report::{PluginFailure, ShutdownTrigger};

/// A finished plugin task.
struct TaskOutcome {
    plugin: String,
    category: Category,
    result: PluginResult<()>,
}

/// Owns the running plugin tasks and the fan-in channel they report on.
pub(crate) struct Supervisor {
    tasks: JoinSet<()>,
    results: mpsc::Receiver<TaskOutcome>,
}

impl Supervisor {
    /// Spawn one task per `(plugin, category)` pair.
    ///
    /// Each task gets a child of `cancel` and reports exactly once, so a
    /// channel sized to the task count never blocks a sender.
    pub(crate) fn start(started: &[(Arc<dyn Pluggable>, Category)], cancel: &CancellationToken) -> Self {
        let (tx, results) = mpsc::channel(started.len().max(1));
        let mut tasks = JoinSet::new();

        for (plugin, category) in started {
            let plugin = Arc::clone(plugin);
            let category = *category;
            let token = cancel.child_token();
            let tx = tx.clone();

            debug!(plugin = %plugin.name(), %category, "Starting plugin task");
            tasks.spawn(async move {
                let result = AssertUnwindSafe(drive(plugin.as_ref(), category, token))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(PluginError::ExecutionFailed("plugin task panicked".to_string()))
                    });
                let outcome = TaskOutcome {
                    plugin: plugin.name().to_string(),
                    category,
                    result,
                };
                // The receiver is gone only once the supervisor is dropped.
                let _ = tx.send(outcome).await;
            });
        }

        info!(tasks = started.len(), "Plugins started");
        Self { tasks, results }
    }

    /// Wait for the first failure or for `shutdown` to resolve.
    ///
    /// Tasks that return `Ok` are logged and do not end the wait; once
    /// every task has finished only `shutdown` can.
    pub(crate) async fn wait<F>(&mut self, shutdown: F) -> ShutdownTrigger
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut open = true;

        loop {
            tokio::select! {
                biased;

                outcome = self.results.recv(), if open => match outcome {
                    Some(TaskOutcome { plugin, category, result: Err(error) }) => {
                        warn!(%plugin, %category, %error, "Plugin failed");
                        return ShutdownTrigger::PluginFailed(PluginFailure { plugin, category, error });
                    }
                    Some(TaskOutcome { plugin, category, result: Ok(()) }) => {
                        info!(%plugin, %category, "Plugin finished");
                    }
                    None => {
                        debug!("All plugin tasks finished, waiting for shutdown signal");
                        open = false;
                    }
                },

                () = &mut shutdown => {
                    info!("Shutdown requested");
                    return ShutdownTrigger::Interrupted;
                }
            }
        }
    }

    /// Collect failures already reported but not yet consumed.
    pub(crate) fn drain_failures(&mut self) -> Vec<PluginFailure> {
        let mut failures = Vec::new();
        while let Ok(outcome) = self.results.try_recv() {
            if let Err(error) = outcome.result {
                warn!(plugin = %outcome.plugin, %error, "Plugin failed during shutdown");
                failures.push(PluginFailure {
                    plugin: outcome.plugin,
                    category: outcome.category,
                    error,
                });
            }
        }
        failures
    }

    /// Let tasks that are still running finish on their own.
    pub(crate) fn detach(mut self) {
        debug!(tasks = self.tasks.len(), "Detaching plugin tasks");
        self.tasks.detach_all();
    }
}

async fn drive(plugin: &dyn Pluggable, category: Category, cancel: CancellationToken) -> PluginResult<()> {
    let missing = || PluginError::MissingCapability {
        plugin: plugin.name().to_string(),
        category,
    };
    match category {
        Category::Sync => plugin.as_syncable().ok_or_else(missing)?.sync(cancel).await,
        Category::Run => plugin.as_runnable().ok_or_else(missing)?.run(cancel).await,
        Category::Build | Category::Shell => Err(missing()),
    }
}
