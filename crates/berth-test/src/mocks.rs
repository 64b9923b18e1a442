//! Scripted plugins and a recording UI.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use berth_core::{
    BuilderConfig, Buildable, CancellationToken, Pluggable, PluginContext, PluginError,
    PluginResult, Runnable, ShellConfig, Shellable, Syncable, Ui,
};

/// What a scripted plugin's `sync`/`run` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Block until the run token is cancelled or the plugin is torn down.
    BlockUntilCancelled,
    /// Return an error straight away.
    FailImmediately(String),
    /// Wait, then return an error unless stopped first.
    FailAfter(Duration, String),
    /// Block until cancelled or torn down, then return an error.
    FailOnCancel(String),
    /// Return `Ok` straight away.
    Succeed,
    /// Never return, ignoring both cancellation and teardown.
    Hang,
}

impl Behavior {
    /// Shorthand for [`Behavior::FailImmediately`].
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self::FailImmediately(message.into())
    }
}

/// An ordered record of plugin calls shared across plugins, as
/// `"{plugin}:{operation}"` strings.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, plugin: &str, operation: &str) {
        if let Ok(mut guard) = self.0.lock() {
            guard.push(format!("{plugin}:{operation}"));
        }
    }

    /// All recorded calls, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

/// Call counters shared by every clone of a [`ScriptedPlugin`].
#[derive(Debug, Default)]
pub struct PluginStats {
    configures: AtomicUsize,
    syncs: AtomicUsize,
    runs: AtomicUsize,
    builds: AtomicUsize,
    publishes: AtomicUsize,
    shells: AtomicUsize,
    attaches: AtomicUsize,
    teardowns: AtomicUsize,
    torn_down: CancellationToken,
    last_shell: Mutex<Option<ShellConfig>>,
    last_builder: Mutex<Option<BuilderConfig>>,
    context: Mutex<Option<Arc<PluginContext>>>,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

impl PluginStats {
    /// Times `configure` was called.
    #[must_use]
    pub fn configures(&self) -> usize {
        self.configures.load(Ordering::SeqCst)
    }

    /// Times `sync` was called.
    #[must_use]
    pub fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }

    /// Times `run` was called.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Times `build` was called.
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Times `publish` was called.
    #[must_use]
    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    /// Times `shell` was called.
    #[must_use]
    pub fn shells(&self) -> usize {
        self.shells.load(Ordering::SeqCst)
    }

    /// Times `attach` was called.
    #[must_use]
    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    /// Times `teardown` was called.
    #[must_use]
    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    /// The config passed to the latest `shell` or `attach`.
    #[must_use]
    pub fn last_shell(&self) -> Option<ShellConfig> {
        self.last_shell.lock().ok().and_then(|g| g.clone())
    }

    /// The config passed to the latest `build` or `publish`.
    #[must_use]
    pub fn last_builder(&self) -> Option<BuilderConfig> {
        self.last_builder.lock().ok().and_then(|g| g.clone())
    }

    /// The context the plugin was configured with.
    #[must_use]
    pub fn context(&self) -> Option<Arc<PluginContext>> {
        self.context.lock().ok().and_then(|g| g.clone())
    }
}

/// A plugin whose capabilities and behavior are set by the test.
///
/// Capabilities default to none; enable them with the builder methods.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScriptedPlugin {
    name: String,
    sync: bool,
    run: bool,
    build: bool,
    shell: bool,
    behavior: Behavior,
    build_error: Option<String>,
    teardown_error: Option<String>,
    teardown_delay: Option<Duration>,
    journal: Option<Journal>,
    stats: Arc<PluginStats>,
}

impl ScriptedPlugin {
    /// A plugin with no capabilities that blocks until cancelled.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sync: false,
            run: false,
            build: false,
            shell: false,
            behavior: Behavior::BlockUntilCancelled,
            build_error: None,
            teardown_error: None,
            teardown_delay: None,
            journal: None,
            stats: Arc::new(PluginStats::default()),
        }
    }

    /// Declare [`Syncable`].
    #[must_use]
    pub fn syncable(mut self) -> Self {
        self.sync = true;
        self
    }

    /// Declare [`Runnable`].
    #[must_use]
    pub fn runnable(mut self) -> Self {
        self.run = true;
        self
    }

    /// Declare [`Buildable`].
    #[must_use]
    pub fn buildable(mut self) -> Self {
        self.build = true;
        self
    }

    /// Declare [`Shellable`].
    #[must_use]
    pub fn shellable(mut self) -> Self {
        self.shell = true;
        self
    }

    /// Set what `sync`/`run` do.
    #[must_use]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Make `build` and `publish` fail.
    #[must_use]
    pub fn with_build_error(mut self, message: impl Into<String>) -> Self {
        self.build_error = Some(message.into());
        self
    }

    /// Make `teardown` fail after doing its work.
    #[must_use]
    pub fn with_teardown_error(mut self, message: impl Into<String>) -> Self {
        self.teardown_error = Some(message.into());
        self
    }

    /// Make `teardown` take this long.
    #[must_use]
    pub fn with_teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay = Some(delay);
        self
    }

    /// Record calls in a shared journal.
    #[must_use]
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// Counters shared by every clone of this plugin.
    #[must_use]
    pub fn stats(&self) -> Arc<PluginStats> {
        Arc::clone(&self.stats)
    }

    fn record(&self, operation: &str) {
        if let Some(journal) = &self.journal {
            journal.record(&self.name, operation);
        }
    }

    async fn drive(&self, cancel: CancellationToken) -> PluginResult<()> {
        match &self.behavior {
            Behavior::BlockUntilCancelled => {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = self.stats.torn_down.cancelled() => {}
                }
                Ok(())
            },
            Behavior::FailImmediately(message) => {
                Err(PluginError::ExecutionFailed(message.clone()))
            },
            Behavior::FailAfter(delay, message) => {
                tokio::select! {
                    () = tokio::time::sleep(*delay) => {
                        Err(PluginError::ExecutionFailed(message.clone()))
                    }
                    () = cancel.cancelled() => Ok(()),
                    () = self.stats.torn_down.cancelled() => Ok(()),
                }
            },
            Behavior::FailOnCancel(message) => {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = self.stats.torn_down.cancelled() => {}
                }
                Err(PluginError::ExecutionFailed(message.clone()))
            },
            Behavior::Succeed => Ok(()),
            Behavior::Hang => std::future::pending().await,
        }
    }

    fn build_result(&self) -> PluginResult<()> {
        match &self.build_error {
            Some(message) => Err(PluginError::ExecutionFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Pluggable for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, ctx: Arc<PluginContext>) {
        bump(&self.stats.configures);
        if let Ok(mut guard) = self.stats.context.lock() {
            *guard = Some(ctx);
        }
        self.record("configure");
    }

    async fn teardown(&self) -> PluginResult<()> {
        bump(&self.stats.teardowns);
        self.record("teardown");
        self.stats.torn_down.cancel();
        if let Some(delay) = self.teardown_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.teardown_error {
            Some(message) => Err(PluginError::ExecutionFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn as_syncable(&self) -> Option<&dyn Syncable> {
        self.sync.then_some(self as &dyn Syncable)
    }

    fn as_runnable(&self) -> Option<&dyn Runnable> {
        self.run.then_some(self as &dyn Runnable)
    }

    fn as_buildable(&self) -> Option<&dyn Buildable> {
        self.build.then_some(self as &dyn Buildable)
    }

    fn as_shellable(&self) -> Option<&dyn Shellable> {
        self.shell.then_some(self as &dyn Shellable)
    }
}

#[async_trait]
impl Syncable for ScriptedPlugin {
    async fn sync(&self, cancel: CancellationToken) -> PluginResult<()> {
        bump(&self.stats.syncs);
        self.record("sync");
        self.drive(cancel).await
    }
}

#[async_trait]
impl Runnable for ScriptedPlugin {
    async fn run(&self, cancel: CancellationToken) -> PluginResult<()> {
        bump(&self.stats.runs);
        self.record("run");
        self.drive(cancel).await
    }
}

#[async_trait]
impl Buildable for ScriptedPlugin {
    async fn build(&self, config: &BuilderConfig) -> PluginResult<()> {
        bump(&self.stats.builds);
        self.record("build");
        if let Ok(mut guard) = self.stats.last_builder.lock() {
            *guard = Some(config.clone());
        }
        self.build_result()
    }

    async fn publish(&self, config: &BuilderConfig) -> PluginResult<()> {
        bump(&self.stats.publishes);
        self.record("publish");
        if let Ok(mut guard) = self.stats.last_builder.lock() {
            *guard = Some(config.clone());
        }
        self.build_result()
    }
}

#[async_trait]
impl Shellable for ScriptedPlugin {
    async fn shell(&self, config: &ShellConfig) -> PluginResult<()> {
        bump(&self.stats.shells);
        self.record("shell");
        if let Ok(mut guard) = self.stats.last_shell.lock() {
            *guard = Some(config.clone());
        }
        Ok(())
    }

    async fn attach(&self, config: &ShellConfig) -> PluginResult<()> {
        bump(&self.stats.attaches);
        self.record("attach");
        if let Ok(mut guard) = self.stats.last_shell.lock() {
            *guard = Some(config.clone());
        }
        Ok(())
    }
}

/// Severity of a recorded UI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiLevel {
    /// [`Ui::output`], including stages and steps.
    Output,
    /// [`Ui::info`].
    Info,
    /// [`Ui::warn`].
    Warn,
    /// [`Ui::error`].
    Error,
}

/// A [`Ui`] that keeps every message for later assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingUi {
    messages: Arc<Mutex<Vec<(UiLevel, String)>>>,
    confirm_answer: bool,
}

impl RecordingUi {
    /// Create an empty recorder that declines every prompt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `confirm` with `answer`.
    #[must_use]
    pub fn with_confirm(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    fn push(&self, level: UiLevel, message: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((level, message.to_string()));
        }
    }

    /// Every message, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<(UiLevel, String)> {
        self.messages.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Messages at one level, in order.
    #[must_use]
    pub fn at(&self, level: UiLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Index of the first message containing `needle`.
    #[must_use]
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.messages().iter().position(|(_, m)| m.contains(needle))
    }

    /// Whether any message at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: UiLevel, needle: &str) -> bool {
        self.at(level).iter().any(|m| m.contains(needle))
    }
}

impl Ui for RecordingUi {
    fn output(&self, message: &str) {
        self.push(UiLevel::Output, message);
    }

    fn info(&self, message: &str) {
        self.push(UiLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(UiLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(UiLevel::Error, message);
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.push(UiLevel::Output, prompt);
        self.confirm_answer
    }
}
