//! Build/publish parameters.

use serde::{Deserialize, Serialize};

/// Parameters passed to [`Buildable`](crate::Buildable) operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Image repository name, without a tag. Empty lets the plugin fall back
    /// to its own configured name.
    #[serde(default)]
    pub image_name: String,
}

impl BuilderConfig {
    /// Create a builder config for an image.
    #[must_use]
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
        }
    }
}
