//! Plugin error types.

use crate::capability::Category;

/// Errors raised by plugins, plugin factories, and the plugin registry.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// No factory is registered under the requested name.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    /// A factory with this name is already registered.
    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),

    /// The plugin name is malformed.
    #[error("invalid plugin name: {0}")]
    InvalidName(String),

    /// The raw parameters from the manifest could not be applied.
    #[error("invalid parameters for plugin {plugin}: {message}")]
    InvalidParameters {
        /// The plugin the parameters were meant for.
        plugin: String,
        /// Why they were rejected.
        message: String,
    },

    /// The plugin was used before `configure` was called.
    #[error("plugin {0} has not been configured")]
    NotConfigured(String),

    /// The plugin does not implement the capability required by a category.
    #[error("plugin {plugin} cannot serve the {category} category")]
    MissingCapability {
        /// Plugin name.
        plugin: String,
        /// The category it was asked to serve.
        category: Category,
    },

    /// An external command exited unsuccessfully.
    #[error("command `{command}` failed: {status}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit status description.
        status: String,
    },

    /// Plugin execution failed.
    #[error("plugin execution failed: {0}")]
    ExecutionFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
