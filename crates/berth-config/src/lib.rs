//! Manifest loading for the Berth orchestrator.
//!
//! A manifest declares the project name, a log verbosity, and four ordered
//! plugin lists (one per [`Category`](berth_core::Category)):
//!
//! ```yaml
//! name: My Project
//! loglevel: 2
//! sync:
//!   - name: watch
//!     config: { paths: [src], command: [rsync, -a, src/, vm:/app/src/] }
//! run:
//!   - name: compose
//! shell:
//!   - name: compose
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use berth_config::RootConfig;
//!
//! let config = RootConfig::load(std::path::Path::new("berth.yml")).unwrap();
//! println!("project: {}", config.name);
//! ```
//!
//! YAML, TOML, and JSON are accepted; the format follows the file extension.
//! Parameters under `config` are opaque here and interpreted by each
//! plugin's factory.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod loader;
pub mod types;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{MANIFEST_FILE_NAMES, default_manifest_path, discover};
pub use types::*;

impl RootConfig {
    /// Load a manifest file.
    ///
    /// See [`loader::load_file`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }

    /// Parse manifest text in the given format.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text fails to parse or validate.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str, format: ManifestFormat) -> ConfigResult<Self> {
        loader::parse_str(content, format, "<inline>")
    }
}
