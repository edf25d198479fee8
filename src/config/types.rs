//! Configuration types and structures.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::containers::{RESOURCES_CONTAINER_TYPE, ReifierRegistry};
use crate::profile::ProfileLayout;
use crate::tree::{self, ConfigTree, TreeError};

/// Where profiles live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Profile root directory (default: `profiles`).
    #[serde(default = "default_profiles_root")]
    pub root: PathBuf,

    /// Naming conventions inside the profile root.
    #[serde(default)]
    pub layout: ProfileLayout,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            root: default_profiles_root(),
            layout: ProfileLayout::default(),
        }
    }
}

fn default_profiles_root() -> PathBuf {
    PathBuf::from("profiles")
}

/// Container definitions and reifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainersConfig {
    /// Directory holding `containers/<name>.<ext>` (default: `configs`).
    #[serde(default = "default_configs_dir")]
    pub configs_dir: PathBuf,

    /// Whitespace-separated container types used when a definition names none.
    #[serde(default = "default_container_type")]
    pub default_type: String,

    /// Default properties per container type. Either nested maps or
    /// dotted keys (`maven.groupId: io.example`).
    #[serde(default)]
    pub reifiers: IndexMap<String, ConfigTree>,
}

impl Default for ContainersConfig {
    fn default() -> Self {
        Self {
            configs_dir: default_configs_dir(),
            default_type: default_container_type(),
            reifiers: IndexMap::new(),
        }
    }
}

fn default_configs_dir() -> PathBuf {
    PathBuf::from("configs")
}

fn default_container_type() -> String {
    RESOURCES_CONTAINER_TYPE.to_string()
}

impl ContainersConfig {
    pub fn default_types(&self) -> Vec<String> {
        self.default_type
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Default properties for a container type, with dotted keys expanded.
    pub fn reifier_defaults(&self, container_type: &str) -> Result<ConfigTree, TreeError> {
        match self.reifiers.get(container_type) {
            Some(defaults) => tree::parse(tree::flatten(defaults)),
            None => Ok(ConfigTree::default()),
        }
    }

    /// Built-in reifiers with the configured default properties applied.
    pub fn registry(&self) -> Result<ReifierRegistry> {
        let mut registry = ReifierRegistry::with_builtins();
        for container_type in self.reifiers.keys() {
            let defaults = self
                .reifier_defaults(container_type)
                .with_context(|| format!("invalid defaults for container type {container_type}"))?;
            registry.set_defaults(container_type.as_str(), defaults);
        }
        Ok(registry)
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profiles: ProfilesConfig,

    #[serde(default)]
    pub containers: ContainersConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        // Empty or comment-only files parse as null
        let config: Option<Config> = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config.unwrap_or_default())
    }
}
