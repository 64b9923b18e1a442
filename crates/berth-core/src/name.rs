//! Plugin names.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

/// Registry key for a plugin factory, as written in the manifest.
///
/// Names like `"compose"` or `"watch"`: non-empty, lowercase alphanumeric
/// characters and hyphens, not starting or ending with a hyphen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PluginName(String);

/// Deserialize with validation so a malformed manifest entry is rejected at
/// parse time.
impl<'de> Deserialize<'de> for PluginName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl PluginName {
    /// Create a new `PluginName`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidName`] if the name is empty or contains
    /// invalid characters.
    pub fn new(name: impl Into<String>) -> PluginResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Create a `PluginName` without validation (for tests and constants).
    #[must_use]
    pub fn from_static(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid plugin name.
    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        Self::validate(name).is_ok()
    }

    fn validate(name: &str) -> PluginResult<()> {
        if name.is_empty() {
            return Err(PluginError::InvalidName(
                "plugin name must not be empty".into(),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(PluginError::InvalidName(format!(
                "plugin name must contain only lowercase alphanumeric characters and hyphens, got: {name}"
            )));
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(PluginError::InvalidName(format!(
                "plugin name must not start or end with a hyphen, got: {name}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PluginName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lets maps keyed by `PluginName` be queried with a `&str`. Ordering and
/// hashing match `String`.
impl Borrow<str> for PluginName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PluginName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
