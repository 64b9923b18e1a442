//! Runtime error types.

use berth_config::ConfigError;
use berth_core::{Category, PluginError};
use thiserror::Error;

use crate::state::LifecycleState;

/// Errors returned by the [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// No manifest path was supplied.
    #[error("no manifest path configured")]
    MissingManifest,

    /// The manifest could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A manifest entry names a plugin the registry does not know.
    #[error("unknown plugin '{name}' in the {category} section")]
    UnknownPlugin {
        /// The declared name.
        name: String,
        /// The section it was declared in.
        category: Category,
    },

    /// A plugin was declared in, or asked for, a category it cannot serve.
    #[error("plugin '{plugin}' cannot serve the {category} category")]
    MissingCapability {
        /// Plugin name.
        plugin: String,
        /// The category required.
        category: Category,
    },

    /// No loaded plugin has this name.
    #[error("plugin not found: {0}")]
    NotFound(String),

    /// A plugin factory or plugin operation failed.
    #[error("plugin '{plugin}' failed: {source}")]
    Plugin {
        /// Plugin name.
        plugin: String,
        /// The plugin's error.
        #[source]
        source: PluginError,
    },

    /// The operation is not allowed in the current lifecycle state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// What was attempted.
        operation: &'static str,
        /// The state it was attempted in.
        state: LifecycleState,
    },
}

impl RuntimeError {
    /// Whether this error comes from a bad or missing manifest.
    ///
    /// The CLI treats these as fatal configuration errors.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::MissingManifest
            | Self::Config(_)
            | Self::UnknownPlugin { .. }
            | Self::MissingCapability { .. } => true,
            Self::Plugin { source, .. } => matches!(source, PluginError::InvalidParameters { .. }),
            Self::NotFound(_) | Self::InvalidState { .. } => false,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
