//! Manifest struct definitions.

use std::fmt;
use std::path::Path;

use berth_core::Category;
use serde::{Deserialize, Serialize};

/// Default log level ordinal (`info`).
pub const DEFAULT_LOG_LEVEL: u8 = 2;

/// Highest accepted log level ordinal (`fatal`).
pub const MAX_LOG_LEVEL: u8 = 5;

/// Parsed manifest. Created once per orchestrator run and immutable after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Free-form project description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Log verbosity ordinal: 0 trace, 1 debug, 2 info, 3 warn, 4 error, 5 fatal.
    #[serde(default = "default_log_level", rename = "loglevel", alias = "log_level")]
    pub log_level: u8,
    /// Synchronization plugins.
    #[serde(default)]
    pub sync: Vec<PluginEntry>,
    /// Environment runners.
    #[serde(default)]
    pub run: Vec<PluginEntry>,
    /// Image builders.
    #[serde(default)]
    pub build: Vec<PluginEntry>,
    /// Interactive shell providers.
    #[serde(default)]
    pub shell: Vec<PluginEntry>,
}

fn default_log_level() -> u8 {
    DEFAULT_LOG_LEVEL
}

impl RootConfig {
    /// The ordered entries declared for a category.
    #[must_use]
    pub fn entries(&self, category: Category) -> &[PluginEntry] {
        match category {
            Category::Sync => &self.sync,
            Category::Run => &self.run,
            Category::Build => &self.build,
            Category::Shell => &self.shell,
        }
    }

    /// Total number of entries across all categories.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        Category::ALL
            .iter()
            .map(|c| self.entries(*c).len())
            .fold(0, usize::saturating_add)
    }

    /// The `tracing` filter level for the manifest's ordinal.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        log_filter_for(self.log_level)
    }
}

/// Map a log level ordinal to a `tracing` filter level.
#[must_use]
pub fn log_filter_for(level: u8) -> &'static str {
    match level {
        0 => "trace",
        1 => "debug",
        2 => "info",
        3 => "warn",
        _ => "error",
    }
}

/// One `(name, raw parameters)` declaration in a category list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Registry name of the plugin.
    pub name: String,
    /// Opaque parameters handed to the plugin factory.
    #[serde(
        default,
        alias = "parameters",
        skip_serializing_if = "serde_json::Value::is_null"
    )]
    pub config: serde_json::Value,
}

impl PluginEntry {
    /// Create an entry with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: serde_json::Value::Null,
        }
    }

    /// Attach raw parameters.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

/// On-disk manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// YAML (`.yml`, `.yaml`).
    Yaml,
    /// TOML (`.toml`).
    Toml,
    /// JSON (`.json`).
    Json,
}

impl ManifestFormat {
    /// Pick the format from a file extension. Unknown extensions are YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Short name used in error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
