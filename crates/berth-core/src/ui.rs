//! User-facing output handle shared with every plugin.

use std::sync::Arc;

/// Shared UI handle.
pub type ArcUi = Arc<dyn Ui>;

/// Human-facing output sink with an optional yes/no prompt.
///
/// Implementations decide presentation (colors, streams). The core only
/// writes to it and never parses what was written.
pub trait Ui: Send + Sync {
    /// Plain output line.
    fn output(&self, message: &str);

    /// Informational message.
    fn info(&self, message: &str);

    /// Warning message.
    fn warn(&self, message: &str);

    /// Error message.
    fn error(&self, message: &str);

    /// Announce a new stage of work.
    fn stage(&self, message: &str) {
        self.output(&format!("Stage : {message}"));
    }

    /// Announce a step within the current stage.
    fn step(&self, message: &str) {
        self.output(&format!(" ---> {message}"));
    }

    /// Ask the user a yes/no question.
    ///
    /// Non-interactive implementations answer `false`.
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// A `Ui` that discards everything. Useful for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUi;

impl Ui for NullUi {
    fn output(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
