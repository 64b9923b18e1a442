//! Plugin registry and built-in plugins for Berth.
//!
//! The [`PluginRegistry`] maps manifest names to factories. Built-ins are
//! added explicitly with [`register_builtin`]:
//!
//! - [`compose`]: run, build, and shell through Docker Compose
//! - [`watch`]: re-run a sync command when files change
//!
//! ```rust
//! use berth_plugins::{PluginRegistry, register_builtin};
//!
//! let mut registry = PluginRegistry::new();
//! register_builtin(&mut registry).unwrap();
//! assert_eq!(registry.names(), vec!["compose", "watch"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod compose;
pub mod params;
pub mod registry;
pub mod watch;

mod exec;

pub use params::PluginParams;
pub use registry::{PluginFactory, PluginRegistry};

use berth_core::PluginResult;

/// Register every built-in plugin.
///
/// # Errors
///
/// Returns an error if a built-in name is already registered.
pub fn register_builtin(registry: &mut PluginRegistry) -> PluginResult<()> {
    compose::register(registry)?;
    watch::register(registry)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use berth_config::PluginEntry;

    use super::*;

    #[test]
    fn builtins_register_once() {
        let mut registry = PluginRegistry::new();
        register_builtin(&mut registry).unwrap();
        assert!(registry.contains(compose::NAME));
        assert!(registry.contains(watch::NAME));
        assert!(register_builtin(&mut registry).is_err());
    }

    #[test]
    fn builtins_instantiate_from_entries() {
        let mut registry = PluginRegistry::new();
        register_builtin(&mut registry).unwrap();

        let compose = registry.create(&PluginEntry::new("compose")).unwrap();
        assert_eq!(compose.name(), "compose");

        let watch = registry
            .create(&PluginEntry::new("watch").with_config(serde_json::json!({"command": ["true"]})))
            .unwrap();
        assert_eq!(watch.name(), "watch");
    }
}
