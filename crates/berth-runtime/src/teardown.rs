//! Teardown coordinator.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use berth_core::Pluggable;
use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::report::{TeardownError, TeardownFailure, TeardownReport};

/// Tear down every plugin concurrently and wait for all of them.
///
/// A plugin listed more than once (the same instance) is torn down once.
/// One plugin's failure, timeout, or panic never affects the others.
pub(crate) async fn teardown_all(
    plugins: &[Arc<dyn Pluggable>],
    timeout: Option<Duration>,
) -> TeardownReport {
    let mut unique: Vec<&Arc<dyn Pluggable>> = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        if !unique.iter().any(|seen| Arc::ptr_eq(seen, plugin)) {
            unique.push(plugin);
        }
    }

    info!(plugins = unique.len(), ?timeout, "Tearing down plugins");
    let mut tasks = JoinSet::new();
    for plugin in unique {
        let plugin = Arc::clone(plugin);
        tasks.spawn(async move {
            let name = plugin.name().to_string();
            let result = teardown_one(plugin.as_ref(), timeout).await;
            (name, result)
        });
    }

    let mut report = TeardownReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((plugin, Ok(()))) => {
                debug!(%plugin, "Teardown complete");
                report.completed.push(plugin);
            },
            Ok((plugin, Err(error))) => {
                warn!(%plugin, %error, "Teardown failed");
                report.failures.push(TeardownFailure { plugin, error });
            },
            // Teardown tasks are never aborted and panics are caught inside.
            Err(e) => warn!(error = %e, "Teardown task did not complete"),
        }
    }

    info!(
        completed = report.completed.len(),
        failed = report.failures.len(),
        "Teardown finished"
    );
    report
}

async fn teardown_one(plugin: &dyn Pluggable, timeout: Option<Duration>) -> Result<(), TeardownError> {
    let guarded = AssertUnwindSafe(plugin.teardown()).catch_unwind();
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, guarded)
            .await
            .map_err(|_| TeardownError::TimedOut(limit))?,
        None => guarded.await,
    };
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TeardownError::Failed(e)),
        Err(_) => Err(TeardownError::Panicked),
    }
}
