//! Post-parse manifest validation.
//!
//! Checks the invariants serde cannot express: a non-empty project name,
//! a log level in range, well-formed plugin names, and map-shaped plugin
//! parameters.

use berth_core::{Category, PluginName};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{MAX_LOG_LEVEL, RootConfig};

/// Validate a parsed manifest.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &RootConfig) -> ConfigResult<()> {
    validate_name(config)?;
    validate_log_level(config)?;
    for category in Category::ALL {
        validate_entries(config, category)?;
    }
    Ok(())
}

fn validate_name(config: &RootConfig) -> ConfigResult<()> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "name".to_owned(),
            message: "project name must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_log_level(config: &RootConfig) -> ConfigResult<()> {
    if config.log_level > MAX_LOG_LEVEL {
        return Err(ConfigError::ValidationError {
            field: "loglevel".to_owned(),
            message: format!(
                "loglevel {} is out of range; must be 0-{MAX_LOG_LEVEL}",
                config.log_level
            ),
        });
    }
    Ok(())
}

fn validate_entries(config: &RootConfig, category: Category) -> ConfigResult<()> {
    for (i, entry) in config.entries(category).iter().enumerate() {
        if let Err(e) = PluginName::new(entry.name.as_str()) {
            return Err(ConfigError::ValidationError {
                field: format!("{category}[{i}].name"),
                message: e.to_string(),
            });
        }
        if !(entry.config.is_null() || entry.config.is_object()) {
            return Err(ConfigError::ValidationError {
                field: format!("{category}[{i}].config"),
                message: format!("parameters for '{}' must be a map", entry.name),
            });
        }
    }
    Ok(())
}
