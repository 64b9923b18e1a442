//! Manifest and registry fixtures.

use std::path::{Path, PathBuf};

use berth_core::Pluggable;
use berth_plugins::PluginRegistry;
use tempfile::TempDir;

use crate::mocks::ScriptedPlugin;

/// A temporary project directory holding a `berth.yml`.
#[derive(Debug)]
pub struct ManifestDir {
    /// Keeps the directory alive.
    pub dir: TempDir,
    /// Path of the written manifest.
    pub path: PathBuf,
}

impl ManifestDir {
    /// Write `content` as `berth.yml` in a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory or file cannot be created.
    #[must_use]
    pub fn new(content: &str) -> Self {
        Self::with_file_name("berth.yml", content)
    }

    /// Write `content` under `file_name` in a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory or file cannot be created.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn with_file_name(file_name: &str, content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, content).unwrap();
        Self { dir, path }
    }

    /// The manifest path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A registry whose factories hand out clones of the given plugins.
///
/// Clones share their [`PluginStats`](crate::PluginStats), so the caller's
/// handle observes every instance the orchestrator creates.
///
/// # Panics
///
/// Panics if two plugins share a name or a name is invalid.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn scripted_registry(plugins: impl IntoIterator<Item = ScriptedPlugin>) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    for plugin in plugins {
        let name = plugin.name().to_string();
        registry
            .register(&name, move |_params| {
                Ok(Box::new(plugin.clone()) as Box<dyn Pluggable>)
            })
            .unwrap();
    }
    registry
}
