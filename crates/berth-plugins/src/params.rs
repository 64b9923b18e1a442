//! Raw plugin parameters from the manifest.

use berth_core::{PluginError, PluginResult};
use serde::de::DeserializeOwned;

/// The opaque `config` map of one manifest entry, as handed to a factory.
///
/// An absent or `null` map is treated as empty, so parameter structs with
/// `#[serde(default)]` deserialize to their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginParams {
    plugin: String,
    raw: serde_json::Value,
}

impl PluginParams {
    /// Wrap the raw parameters for `plugin`.
    #[must_use]
    pub fn new(plugin: impl Into<String>, raw: serde_json::Value) -> Self {
        let raw = if raw.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            raw
        };
        Self {
            plugin: plugin.into(),
            raw,
        }
    }

    /// Parameters with nothing set.
    #[must_use]
    pub fn empty(plugin: impl Into<String>) -> Self {
        Self::new(plugin, serde_json::Value::Null)
    }

    /// The plugin these parameters belong to.
    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// The raw value.
    #[must_use]
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Deserialize into the plugin's own parameter type.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidParameters`] if the map does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> PluginResult<T> {
        serde_json::from_value(self.raw.clone()).map_err(|e| self.invalid(e.to_string()))
    }

    /// Build an [`PluginError::InvalidParameters`] for this plugin.
    #[must_use]
    pub fn invalid(&self, message: impl Into<String>) -> PluginError {
        PluginError::InvalidParameters {
            plugin: self.plugin.clone(),
            message: message.into(),
        }
    }
}
