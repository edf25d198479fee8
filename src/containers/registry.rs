//! Container type tags mapped to reifier factories.

use indexmap::IndexMap;

use super::ProjectReifier;
use super::resources::{RESOURCES_CONTAINER_TYPE, ResourcesReifier};
use crate::tree::{self, ConfigTree};

/// Builds a reifier from the default properties configured for its type.
pub type ReifierFactory = fn(ConfigTree) -> Box<dyn ProjectReifier>;

/// Known container types, resolved once at startup.
#[derive(Clone, Default)]
pub struct ReifierRegistry {
    factories: IndexMap<String, ReifierFactory>,
    defaults: IndexMap<String, ConfigTree>,
}

impl std::fmt::Debug for ReifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReifierRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl ReifierRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in container type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RESOURCES_CONTAINER_TYPE, ResourcesReifier::create);
        registry
    }

    /// Register (or replace) the factory for a container type.
    pub fn register(&mut self, container_type: impl Into<String>, factory: ReifierFactory) -> &mut Self {
        self.factories.insert(container_type.into(), factory);
        self
    }

    /// Merge default properties for a container type over any set before.
    pub fn set_defaults(&mut self, container_type: impl Into<String>, defaults: ConfigTree) -> &mut Self {
        let slot = self.defaults.entry(container_type.into()).or_default();
        let base = std::mem::take(slot);
        *slot = tree::merge(base, defaults);
        self
    }

    pub fn defaults(&self, container_type: &str) -> Option<&ConfigTree> {
        self.defaults.get(container_type)
    }

    pub fn contains(&self, container_type: &str) -> bool {
        self.factories.contains_key(container_type)
    }

    /// Instantiate the reifier for a container type.
    pub fn create(&self, container_type: &str) -> Option<Box<dyn ProjectReifier>> {
        let factory = self.factories.get(container_type)?;
        let defaults = self
            .defaults
            .get(container_type)
            .cloned()
            .unwrap_or_default();
        Some(factory(defaults))
    }

    /// Registered type tags, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::materialize::MaterializedConfig;
    use std::path::Path;

    struct Recording(ConfigTree);

    impl ProjectReifier for Recording {
        fn reify(&self, target: &Path, _: &ConfigTree, _: &MaterializedConfig) -> Result<()> {
            let text = serde_json::to_string(&self.0).unwrap_or_default();
            std::fs::write(target.join("defaults.json"), text)
                .map_err(|err| crate::error::ProfileError::io("write", target, err))
        }
    }

    fn recording(defaults: ConfigTree) -> Box<dyn ProjectReifier> {
        Box::new(Recording(defaults))
    }

    #[test]
    fn test_builtins_include_resources() {
        let registry = ReifierRegistry::with_builtins();
        assert!(registry.contains(RESOURCES_CONTAINER_TYPE));
        assert_eq!(registry.types().collect::<Vec<_>>(), vec![RESOURCES_CONTAINER_TYPE]);
    }

    #[test]
    fn test_unknown_type_creates_nothing() {
        assert!(ReifierRegistry::new().create("karaf").is_none());
    }

    #[test]
    fn test_defaults_accumulate() {
        let mut registry = ReifierRegistry::new();
        registry.register("custom", recording);
        registry.set_defaults("custom", tree::parse([("maven.groupId", "a"), ("x", "1")]).unwrap());
        registry.set_defaults("custom", tree::parse([("maven.groupId", "b")]).unwrap());

        let defaults = tree::flatten(registry.defaults("custom").unwrap());
        assert_eq!(defaults["maven.groupId"], "b");
        assert_eq!(defaults["x"], "1");
        assert!(registry.create("custom").is_some());
    }
}
