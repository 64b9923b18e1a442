//! Plugin registry.
//!
//! Maps manifest names to factories. The orchestrator asks the registry to
//! instantiate every manifest entry; nothing registers itself implicitly.

use std::collections::BTreeMap;
use std::fmt;

use berth_config::PluginEntry;
use berth_core::{Pluggable, PluginError, PluginName, PluginResult};
use tracing::{debug, info};

use crate::params::PluginParams;

/// Builds one plugin instance from its manifest parameters.
pub type PluginFactory =
    Box<dyn Fn(&PluginParams) -> PluginResult<Box<dyn Pluggable>> + Send + Sync + 'static>;

/// Registry of plugin factories, keyed by name.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<PluginName, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidName`] for a malformed name and
    /// [`PluginError::AlreadyRegistered`] if the name is taken.
    pub fn register<F>(&mut self, name: &str, factory: F) -> PluginResult<()>
    where
        F: Fn(&PluginParams) -> PluginResult<Box<dyn Pluggable>> + Send + Sync + 'static,
    {
        let name = PluginName::new(name)?;
        if self.factories.contains_key(&name) {
            return Err(PluginError::AlreadyRegistered(name.to_string()));
        }

        info!(plugin = %name, "Registered plugin factory");
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Instantiate the plugin a manifest entry declares.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] if no factory is registered
    /// under the entry's name, or whatever the factory returns.
    pub fn create(&self, entry: &PluginEntry) -> PluginResult<Box<dyn Pluggable>> {
        let factory = self
            .factories
            .get(entry.name.as_str())
            .ok_or_else(|| PluginError::UnknownPlugin(entry.name.clone()))?;

        let params = PluginParams::new(entry.name.as_str(), entry.config.clone());
        debug!(plugin = %entry.name, "Instantiating plugin");
        factory(&params)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(PluginName::as_str).collect()
    }

    /// Whether a factory is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use berth_core::PluginContext;

    use super::*;

    struct Named(String);

    #[async_trait]
    impl Pluggable for Named {
        fn name(&self) -> &str {
            &self.0
        }
        fn configure(&mut self, _ctx: Arc<PluginContext>) {}
        async fn teardown(&self) -> PluginResult<()> {
            Ok(())
        }
    }

    fn named_factory(params: &PluginParams) -> PluginResult<Box<dyn Pluggable>> {
        Ok(Box::new(Named(params.plugin().to_string())))
    }

    #[test]
    fn register_and_create() {
        let mut registry = PluginRegistry::new();
        registry.register("alpha", named_factory).unwrap();

        let plugin = registry.create(&PluginEntry::new("alpha")).unwrap();
        assert_eq!(plugin.name(), "alpha");
        assert!(registry.contains("alpha"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_rejected() {
        let mut registry = PluginRegistry::new();
        registry.register("alpha", named_factory).unwrap();
        let err = registry.register("alpha", named_factory).unwrap_err();
        assert!(matches!(err, PluginError::AlreadyRegistered(name) if name == "alpha"));
    }

    #[test]
    fn invalid_name_rejected() {
        let mut registry = PluginRegistry::new();
        let err = registry.register("Not Valid", named_factory).unwrap_err();
        assert!(matches!(err, PluginError::InvalidName(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_entry_is_error() {
        let registry = PluginRegistry::new();
        let err = registry.create(&PluginEntry::new("ghost")).unwrap_err();
        assert!(matches!(err, PluginError::UnknownPlugin(name) if name == "ghost"));
    }

    #[test]
    fn factory_receives_entry_config() {
        let mut registry = PluginRegistry::new();
        registry
            .register("echo", |params: &PluginParams| {
                let label = params.raw()["label"].as_str().unwrap_or("none").to_string();
                Ok(Box::new(Named(label)) as Box<dyn Pluggable>)
            })
            .unwrap();

        let entry = PluginEntry::new("echo").with_config(serde_json::json!({"label": "custom"}));
        assert_eq!(registry.create(&entry).unwrap().name(), "custom");
    }

    #[test]
    fn lookup_picks_exact_name_among_many() {
        let mut registry = PluginRegistry::new();
        for name in ["compose", "compose-v2", "exec", "watch"] {
            registry.register(name, named_factory).unwrap();
        }

        assert_eq!(registry.create(&PluginEntry::new("compose-v2")).unwrap().name(), "compose-v2");
        assert!(registry.contains("exec"));
        assert!(!registry.contains("compose-"));
        assert!(!registry.contains("Watch"));
        assert!(matches!(
            registry.create(&PluginEntry::new("Watch")),
            Err(PluginError::UnknownPlugin(name)) if name == "Watch"
        ));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = PluginRegistry::new();
        registry.register("zeta", named_factory).unwrap();
        registry.register("alpha", named_factory).unwrap();
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
