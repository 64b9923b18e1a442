//! Capability traits and manifest categories.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::builder::BuilderConfig;
use crate::context::PluginContext;
use crate::error::PluginResult;
use crate::shell::ShellConfig;

/// A manifest section. Each category requires one capability of the
/// plugins declared under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// File synchronization plugins ([`Syncable`]).
    Sync,
    /// Environment runners ([`Runnable`]).
    Run,
    /// Image builders ([`Buildable`]).
    Build,
    /// Interactive shell providers ([`Shellable`]).
    Shell,
}

impl Category {
    /// All categories, in manifest order.
    pub const ALL: [Category; 4] = [Self::Sync, Self::Run, Self::Build, Self::Shell];

    /// The manifest key for this category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Run => "run",
            Self::Build => "build",
            Self::Shell => "shell",
        }
    }

    /// Whether plugins in this category are started by `run` and torn down
    /// on shutdown.
    #[must_use]
    pub fn is_long_running(self) -> bool {
        matches!(self, Self::Sync | Self::Run)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities a plugin value declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CapabilitySet {
    sync: bool,
    run: bool,
    build: bool,
    shell: bool,
}

impl CapabilitySet {
    /// Collect the capabilities a plugin answers to.
    #[must_use]
    pub fn of(plugin: &(impl Pluggable + ?Sized)) -> Self {
        Self {
            sync: plugin.as_syncable().is_some(),
            run: plugin.as_runnable().is_some(),
            build: plugin.as_buildable().is_some(),
            shell: plugin.as_shellable().is_some(),
        }
    }

    /// Whether the set can serve the given category.
    #[must_use]
    pub fn contains(self, category: Category) -> bool {
        match category {
            Category::Sync => self.sync,
            Category::Run => self.run,
            Category::Build => self.build,
            Category::Shell => self.shell,
        }
    }

    /// Iterate over the categories this set can serve.
    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// True when no capability beyond [`Pluggable`] is declared.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.iter().next().is_none()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(Category::as_str).collect();
        f.write_str(&names.join("+"))
    }
}

/// The base contract every plugin satisfies.
///
/// A plugin is created by a registry factory, configured once with the
/// shared [`PluginContext`], and then driven through whichever capability
/// traits it declares via the `as_*` accessors.
#[async_trait]
pub trait Pluggable: Send + Sync + 'static {
    /// Stable plugin name, used for lookup.
    fn name(&self) -> &str;

    /// Apply the shared project context.
    ///
    /// Called exactly once, before any capability method. Must not block.
    fn configure(&mut self, ctx: Arc<PluginContext>);

    /// Release everything the plugin acquired.
    ///
    /// Invoked exactly once per started plugin during shutdown. Not
    /// required to be idempotent.
    async fn teardown(&self) -> PluginResult<()>;

    /// This plugin as a [`Syncable`], if it declares that capability.
    fn as_syncable(&self) -> Option<&dyn Syncable> {
        None
    }

    /// This plugin as a [`Runnable`], if it declares that capability.
    fn as_runnable(&self) -> Option<&dyn Runnable> {
        None
    }

    /// This plugin as a [`Buildable`], if it declares that capability.
    fn as_buildable(&self) -> Option<&dyn Buildable> {
        None
    }

    /// This plugin as a [`Shellable`], if it declares that capability.
    fn as_shellable(&self) -> Option<&dyn Shellable> {
        None
    }

    /// The full capability set.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::of(self)
    }
}

impl fmt::Debug for dyn Pluggable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pluggable")
            .field("name", &self.name())
            .field("capabilities", &self.capabilities().to_string())
            .finish_non_exhaustive()
    }
}

/// Continuous synchronization between the host and the environment.
#[async_trait]
pub trait Syncable: Pluggable {
    /// Perform the initial sync and keep syncing.
    ///
    /// Blocks until `cancel` fires, the plugin is torn down, or a failure
    /// occurs. A returned error is fatal to the whole run.
    async fn sync(&self, cancel: CancellationToken) -> PluginResult<()>;
}

/// Brings up and supervises a runtime environment.
#[async_trait]
pub trait Runnable: Pluggable {
    /// Start the environment and supervise it.
    ///
    /// Same blocking and failure semantics as [`Syncable::sync`].
    async fn run(&self, cancel: CancellationToken) -> PluginResult<()>;
}

/// One-shot image build and publish.
#[async_trait]
pub trait Buildable: Pluggable {
    /// Build the image.
    async fn build(&self, config: &BuilderConfig) -> PluginResult<()>;

    /// Push the built image to its registry.
    async fn publish(&self, config: &BuilderConfig) -> PluginResult<()>;
}

/// Interactive access to a running environment.
#[async_trait]
pub trait Shellable: Pluggable {
    /// Open an interactive session, starting the environment if needed.
    async fn shell(&self, config: &ShellConfig) -> PluginResult<()>;

    /// Attach to an already-running environment without restarting it.
    async fn attach(&self, config: &ShellConfig) -> PluginResult<()>;
}
