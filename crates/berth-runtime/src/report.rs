//! Outcomes of a supervised run.

use std::fmt;
use std::time::Duration;

use berth_core::{Category, PluginError};

/// A sync or run task that returned an error.
#[derive(Debug)]
pub struct PluginFailure {
    /// Plugin name.
    pub plugin: String,
    /// The category the task was started for.
    pub category: Category,
    /// The returned error.
    pub error: PluginError,
}

impl fmt::Display for PluginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} plugin '{}' failed: {}", self.category, self.plugin, self.error)
    }
}

/// What ended a run.
#[derive(Debug)]
pub enum ShutdownTrigger {
    /// The shutdown future resolved (Ctrl-C, SIGTERM, or a test signal).
    Interrupted,
    /// The first observed plugin failure.
    PluginFailed(PluginFailure),
}

impl ShutdownTrigger {
    /// The failure, if a plugin triggered shutdown.
    #[must_use]
    pub fn failure(&self) -> Option<&PluginFailure> {
        match self {
            Self::Interrupted => None,
            Self::PluginFailed(failure) => Some(failure),
        }
    }
}

/// Why one plugin's teardown did not complete cleanly.
#[derive(Debug)]
pub enum TeardownError {
    /// `teardown` returned an error.
    Failed(PluginError),
    /// `teardown` did not finish within the configured limit.
    TimedOut(Duration),
    /// `teardown` panicked.
    Panicked,
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "{e}"),
            Self::TimedOut(limit) => write!(f, "timed out after {limit:?}"),
            Self::Panicked => f.write_str("panicked"),
        }
    }
}

/// One plugin whose teardown did not complete cleanly.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Plugin name.
    pub plugin: String,
    /// What went wrong.
    pub error: TeardownError,
}

/// Aggregate result of tearing down every started plugin.
///
/// Teardown never stops early, so every started plugin appears in exactly
/// one of the two lists.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Plugins whose teardown returned `Ok`.
    pub completed: Vec<String>,
    /// Plugins whose teardown failed, timed out, or panicked.
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// True when every teardown succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of plugins torn down, successfully or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed.len().saturating_add(self.failures.len())
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    /// What ended the run.
    pub trigger: ShutdownTrigger,
    /// Teardown results.
    pub teardown: TeardownReport,
    /// Task failures observed after the trigger, up to the end of teardown.
    pub late_failures: Vec<PluginFailure>,
}

impl RunReport {
    /// True when the run ended by interrupt, no plugin failed while
    /// stopping, and everything shut down cleanly.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.trigger, ShutdownTrigger::Interrupted)
            && self.late_failures.is_empty()
            && self.teardown.is_clean()
    }
}
