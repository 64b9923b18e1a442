//! Shared project context handed to every plugin.

use std::fmt;
use std::sync::Arc;

use crate::ui::{ArcUi, NullUi};

/// Cross-cutting values every plugin needs.
///
/// Built once by the orchestrator from the manifest and shared read-only
/// (behind an `Arc`) with every plugin instance.
#[derive(Clone)]
pub struct PluginContext {
    /// Output handle for human-readable messages.
    pub ui: ArcUi,
    /// The project name exactly as declared in the manifest.
    pub project_name: String,
    /// Normalized project identifier for resource names (containers,
    /// compose projects).
    pub project_name_safe: String,
}

impl PluginContext {
    /// Create a context for the given project.
    #[must_use]
    pub fn new(ui: ArcUi, project_name: impl Into<String>) -> Self {
        let project_name = project_name.into();
        let project_name_safe = safe_project_name(&project_name);
        Self {
            ui,
            project_name,
            project_name_safe,
        }
    }

    /// Create a context that discards all UI output.
    #[must_use]
    pub fn headless(project_name: impl Into<String>) -> Self {
        Self::new(Arc::new(NullUi), project_name)
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("project_name", &self.project_name)
            .field("project_name_safe", &self.project_name_safe)
            .finish_non_exhaustive()
    }
}

/// Lowercase the name and strip spaces.
#[must_use]
pub fn safe_project_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}
