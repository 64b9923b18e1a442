//! The plugin orchestrator.
//!
//! Loads the manifest, instantiates and configures every declared plugin,
//! and drives them:
//!
//! - `run`: start sync and run plugins concurrently, wait for the first
//!   failure or an interrupt, then tear everything down
//! - `build` / `publish`: call build plugins one after another
//! - `shell` / `attach`: open a session through a shell plugin

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use berth_config::RootConfig;
use berth_core::{
    ArcUi, BuilderConfig, Buildable, Category, Pluggable, PluginContext, PluginError, ShellConfig,
    Shellable,
};
use berth_plugins::PluginRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::report::{RunReport, ShutdownTrigger, TeardownReport};
use crate::signal::shutdown_signal;
use crate::state::LifecycleState;
use crate::supervisor::Supervisor;
use crate::teardown::teardown_all;

/// Construction-time settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Manifest to load. Required by every operation that loads plugins.
    pub manifest_path: Option<PathBuf>,
    /// Upper bound for each plugin's teardown. `None` waits indefinitely.
    pub teardown_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    /// Settings for the given manifest.
    #[must_use]
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: Some(manifest_path.into()),
            teardown_timeout: None,
        }
    }

    /// Bound each plugin's teardown.
    #[must_use]
    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = Some(timeout);
        self
    }
}

/// Plugins instantiated from one manifest. Written once by `load_plugins`,
/// read-only afterwards.
#[derive(Default)]
struct LoadedPlugins {
    sync: Vec<Arc<dyn Pluggable>>,
    run: Vec<Arc<dyn Pluggable>>,
    build: Vec<Arc<dyn Pluggable>>,
    shell: Vec<Arc<dyn Pluggable>>,
    all: Vec<Arc<dyn Pluggable>>,
}

impl LoadedPlugins {
    fn category(&self, category: Category) -> &[Arc<dyn Pluggable>] {
        match category {
            Category::Sync => &self.sync,
            Category::Run => &self.run,
            Category::Build => &self.build,
            Category::Shell => &self.shell,
        }
    }

    fn push(&mut self, category: Category, plugin: Arc<dyn Pluggable>) {
        let list = match category {
            Category::Sync => &mut self.sync,
            Category::Run => &mut self.run,
            Category::Build => &mut self.build,
            Category::Shell => &mut self.shell,
        };
        list.push(Arc::clone(&plugin));
        self.all.push(plugin);
    }
}

/// Owns every plugin instance for the lifetime of the process.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: PluginRegistry,
    ui: ArcUi,
    state: LifecycleState,
    manifest: Option<RootConfig>,
    context: Option<Arc<PluginContext>>,
    plugins: LoadedPlugins,
    started: Vec<Arc<dyn Pluggable>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator. Nothing is loaded until [`load_plugins`](Self::load_plugins).
    #[must_use]
    pub fn new(config: OrchestratorConfig, registry: PluginRegistry, ui: ArcUi) -> Self {
        Self {
            config,
            registry,
            ui,
            state: LifecycleState::Unconfigured,
            manifest: None,
            context: None,
            plugins: LoadedPlugins::default(),
            started: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The loaded manifest.
    #[must_use]
    pub fn manifest(&self) -> Option<&RootConfig> {
        self.manifest.as_ref()
    }

    /// The shared plugin context, once loaded.
    #[must_use]
    pub fn context(&self) -> Option<&Arc<PluginContext>> {
        self.context.as_ref()
    }

    /// Every loaded plugin, in manifest order (sync, run, build, shell).
    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn Pluggable>] {
        &self.plugins.all
    }

    /// Plugins loaded for one category.
    #[must_use]
    pub fn category_plugins(&self, category: Category) -> &[Arc<dyn Pluggable>] {
        self.plugins.category(category)
    }

    /// Token cancelled when a run begins shutting down.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Load the manifest and instantiate, check, and configure every entry.
    ///
    /// All-or-nothing: on error no plugin is kept and the state stays
    /// [`LifecycleState::Unconfigured`]. A no-op once loaded.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no manifest path was given, the
    /// manifest does not load, an entry names an unknown plugin, a plugin
    /// factory rejects its parameters, or a plugin lacks the capability its
    /// section requires.
    pub fn load_plugins(&mut self) -> RuntimeResult<()> {
        if self.state.is_loaded() {
            debug!(state = %self.state, "Plugins already loaded");
            return Ok(());
        }

        let path = self
            .config
            .manifest_path
            .clone()
            .ok_or(RuntimeError::MissingManifest)?;
        let manifest = RootConfig::load(&path)?;
        let context = Arc::new(PluginContext::new(Arc::clone(&self.ui), manifest.name.as_str()));

        let mut loaded = LoadedPlugins::default();
        for category in Category::ALL {
            for entry in manifest.entries(category) {
                let mut plugin = self.registry.create(entry).map_err(|e| match e {
                    PluginError::UnknownPlugin(name) => RuntimeError::UnknownPlugin { name, category },
                    source => RuntimeError::Plugin {
                        plugin: entry.name.clone(),
                        source,
                    },
                })?;

                if !plugin.capabilities().contains(category) {
                    return Err(RuntimeError::MissingCapability {
                        plugin: entry.name.clone(),
                        category,
                    });
                }

                plugin.configure(Arc::clone(&context));
                debug!(plugin = %plugin.name(), %category, "Plugin configured");
                loaded.push(category, Arc::from(plugin));
            }
        }

        info!(
            project = %context.project_name,
            sync = loaded.sync.len(),
            run = loaded.run.len(),
            build = loaded.build.len(),
            shell = loaded.shell.len(),
            "Plugins loaded"
        );
        self.plugins = loaded;
        self.context = Some(context);
        self.manifest = Some(manifest);
        self.state = LifecycleState::Loaded;
        Ok(())
    }

    /// Find a loaded plugin by name.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] if no loaded plugin has that name.
    pub fn plugin(&self, name: &str) -> RuntimeResult<Arc<dyn Pluggable>> {
        self.plugins
            .all
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    /// Find a loaded plugin by name that can open shells.
    ///
    /// Instances declared in the shell section are preferred.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] if no loaded plugin has that name
    /// and [`RuntimeError::MissingCapability`] if none of those that do is
    /// shellable.
    pub fn shell_plugin(&self, name: &str) -> RuntimeResult<&dyn Shellable> {
        let mut candidates = self
            .plugins
            .shell
            .iter()
            .chain(self.plugins.all.iter())
            .filter(|p| p.name() == name)
            .peekable();

        if candidates.peek().is_none() {
            return Err(RuntimeError::NotFound(name.to_string()));
        }
        candidates
            .find_map(|p| p.as_shellable())
            .ok_or_else(|| RuntimeError::MissingCapability {
                plugin: name.to_string(),
                category: Category::Shell,
            })
    }

    /// Open an interactive session.
    ///
    /// `overrides` is merged onto [`ShellConfig::default`] first.
    ///
    /// # Errors
    ///
    /// Returns a load or lookup error, or the plugin's own failure.
    pub async fn shell(&mut self, name: &str, overrides: ShellConfig) -> RuntimeResult<()> {
        self.load_plugins()?;
        let config = ShellConfig::merged(overrides);
        info!(plugin = name, service = %config.service, "Opening shell");
        self.shell_plugin(name)?
            .shell(&config)
            .await
            .map_err(|source| RuntimeError::Plugin {
                plugin: name.to_string(),
                source,
            })
    }

    /// Attach to a running environment.
    ///
    /// `overrides` is merged onto [`ShellConfig::default`] first.
    ///
    /// # Errors
    ///
    /// Returns a load or lookup error, or the plugin's own failure.
    pub async fn attach(&mut self, name: &str, overrides: ShellConfig) -> RuntimeResult<()> {
        self.load_plugins()?;
        let config = ShellConfig::merged(overrides);
        info!(plugin = name, service = %config.service, "Attaching");
        self.shell_plugin(name)?
            .attach(&config)
            .await
            .map_err(|source| RuntimeError::Plugin {
                plugin: name.to_string(),
                source,
            })
    }

    /// Build with every build plugin, in manifest order, stopping at the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns a load error or the first plugin failure.
    pub async fn build(&mut self, config: &BuilderConfig) -> RuntimeResult<()> {
        self.load_plugins()?;
        for (plugin, builder) in self.builders()? {
            info!(%plugin, image = %config.image_name, "Building");
            builder
                .build(config)
                .await
                .map_err(|source| RuntimeError::Plugin { plugin, source })?;
        }
        Ok(())
    }

    /// Publish with every build plugin, in manifest order, stopping at the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns a load error or the first plugin failure.
    pub async fn publish(&mut self, config: &BuilderConfig) -> RuntimeResult<()> {
        self.load_plugins()?;
        for (plugin, builder) in self.builders()? {
            info!(%plugin, image = %config.image_name, "Publishing");
            builder
                .publish(config)
                .await
                .map_err(|source| RuntimeError::Plugin { plugin, source })?;
        }
        Ok(())
    }

    fn builders(&self) -> RuntimeResult<Vec<(String, &dyn Buildable)>> {
        self.plugins
            .build
            .iter()
            .map(|p| {
                p.as_buildable()
                    .map(|b| (p.name().to_string(), b))
                    .ok_or_else(|| RuntimeError::MissingCapability {
                        plugin: p.name().to_string(),
                        category: Category::Build,
                    })
            })
            .collect()
    }

    /// Run until Ctrl-C (or SIGTERM) or the first plugin failure.
    ///
    /// # Errors
    ///
    /// See [`run_until`](Self::run_until).
    pub async fn run(&mut self) -> RuntimeResult<RunReport> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves or the first plugin failure.
    ///
    /// Loads plugins if needed, starts every sync and run plugin as its own
    /// task, and waits. On the trigger it reports through the UI, cancels
    /// the run token, and tears down every started plugin. Returns only
    /// after teardown has finished.
    ///
    /// # Errors
    ///
    /// Returns a load error, or [`RuntimeError::InvalidState`] if the
    /// orchestrator has already run.
    pub async fn run_until<F>(&mut self, shutdown: F) -> RuntimeResult<RunReport>
    where
        F: Future<Output = ()>,
    {
        match self.state {
            LifecycleState::Unconfigured => self.load_plugins()?,
            LifecycleState::Loaded => {},
            state @ (LifecycleState::Running | LifecycleState::TearingDown | LifecycleState::Stopped) => {
                return Err(RuntimeError::InvalidState { operation: "run", state });
            },
        }

        let tasks: Vec<(Arc<dyn Pluggable>, Category)> = [Category::Sync, Category::Run]
            .into_iter()
            .flat_map(|category| {
                self.plugins
                    .category(category)
                    .iter()
                    .map(move |p| (Arc::clone(p), category))
            })
            .collect();
        self.started = tasks.iter().map(|(p, _)| Arc::clone(p)).collect();
        self.state = LifecycleState::Running;

        let mut supervisor = Supervisor::start(&tasks, &self.cancel);
        let trigger = supervisor.wait(shutdown).await;

        match &trigger {
            ShutdownTrigger::PluginFailed(failure) => {
                self.ui.error(&failure.to_string());
                self.ui.warn("Shutting down...");
            },
            ShutdownTrigger::Interrupted => {
                self.ui.info("Interrupt received, shutting down...");
            },
        }
        self.cancel.cancel();

        let teardown = self.teardown().await;
        let late_failures = supervisor.drain_failures();
        supervisor.detach();
        self.state = LifecycleState::Stopped;

        Ok(RunReport {
            trigger,
            teardown,
            late_failures,
        })
    }

    /// Tear down every started sync and run plugin concurrently.
    ///
    /// Each started plugin is torn down exactly once across all calls;
    /// failures are collected in the report and never stop the others.
    pub async fn teardown(&mut self) -> TeardownReport {
        if self.started.is_empty() {
            return TeardownReport::default();
        }
        self.state = LifecycleState::TearingDown;
        let started = std::mem::take(&mut self.started);
        let report = teardown_all(&started, self.config.teardown_timeout).await;

        for failure in &report.failures {
            self.ui
                .warn(&format!("teardown of '{}' failed: {}", failure.plugin, failure.error));
        }
        if !report.is_clean() {
            warn!(failed = report.failures.len(), "Some plugins did not tear down cleanly");
        }
        report
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("plugins", &self.plugins.all)
            .finish_non_exhaustive()
    }
}
