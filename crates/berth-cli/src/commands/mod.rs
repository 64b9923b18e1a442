//! Subcommand implementations.

pub(crate) mod build;
pub(crate) mod cleanup;
pub(crate) mod plugins;
pub(crate) mod proxy;
pub(crate) mod run;
pub(crate) mod shell;
pub(crate) mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use berth_core::ArcUi;
use berth_plugins::{PluginRegistry, register_builtin};
use berth_runtime::{Orchestrator, OrchestratorConfig};

/// Registry with every built-in plugin.
pub(crate) fn builtin_registry() -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    register_builtin(&mut registry).context("failed to register built-in plugins")?;
    Ok(registry)
}

/// Build an orchestrator for `manifest` and load its plugins.
pub(crate) fn load_orchestrator(manifest: &Path, ui: ArcUi) -> Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new(OrchestratorConfig::new(manifest), builtin_registry()?, ui);
    orchestrator.load_plugins()?;
    Ok(orchestrator)
}
