//! Orchestrator lifecycle.

use std::fmt;

/// Where an [`Orchestrator`](crate::Orchestrator) is in its lifecycle.
///
/// ```text
/// Unconfigured → Loaded → Running → TearingDown → Stopped
/// ```
///
/// There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No manifest loaded yet.
    Unconfigured,
    /// Plugins are instantiated and configured, none started.
    Loaded,
    /// Sync and run plugins are executing.
    Running,
    /// Shutdown was triggered and teardown is in progress.
    TearingDown,
    /// Teardown finished.
    Stopped,
}

impl LifecycleState {
    /// Lowercase label for logs and errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Loaded => "loaded",
            Self::Running => "running",
            Self::TearingDown => "tearing down",
            Self::Stopped => "stopped",
        }
    }

    /// Whether plugins have been loaded (in any later state too).
    #[must_use]
    pub fn is_loaded(self) -> bool {
        !matches!(self, Self::Unconfigured)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
