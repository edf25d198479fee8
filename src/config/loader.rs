//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::types::Config;
use crate::tree::{ConfigTree, merge_all};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the configuration file inside a tier directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// Project-level config (`./.profiles/`)
    Project = 1,
    /// User-level config (`~/.profiles/`)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Paths for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Explicit config file replacing tier discovery
    pub explicit_file: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: PROFILES_USER_DIR or ~/.profiles
        let user_dir = std::env::var("PROFILES_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".profiles")));

        // Project dir: PROFILES_PROJECT_DIR or $CWD/.profiles
        let project_dir = std::env::var("PROFILES_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(".profiles")));

        let explicit_file = std::env::var("PROFILES_CONFIG_PATH").ok().map(PathBuf::from);

        Self {
            project_dir,
            user_dir,
            explicit_file,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
            explicit_file: None,
        }
    }

    /// Use a single config file instead of the tiers.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(file.into());
        self
    }

    /// Config file for a tier, if that tier has a directory.
    pub fn config_file(&self, tier: ConfigTier) -> Option<PathBuf> {
        match tier {
            ConfigTier::Project => self.project_dir.as_ref().map(|d| d.join(CONFIG_FILE)),
            ConfigTier::User => self.user_dir.as_ref().map(|d| d.join(CONFIG_FILE)),
            ConfigTier::Defaults | ConfigTier::Environment => None,
        }
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Config files that contributed, lowest tier first
    sources: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with_env(paths, |name| std::env::var(name).ok())
    }

    /// Load configuration, reading environment overrides through `env`.
    pub fn load_with_env(paths: ConfigPaths, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Explicit config file replaces tier discovery
        if let Some(ref explicit) = paths.explicit_file {
            let mut config = Config::load(explicit)?;
            Self::apply_env_overrides(&mut config, &env);
            return Ok(Self {
                sources: vec![explicit.clone()],
                paths,
                config,
            });
        }

        let mut trees: Vec<ConfigTree> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        let defaults = serde_json::to_value(Config::default())?;
        trees.push(ConfigTree::from_json(defaults));

        // Tiers 2 and 3: project, then user
        for tier in [ConfigTier::Project, ConfigTier::User] {
            let Some(file) = paths.config_file(tier) else {
                continue;
            };
            if let Some(tree) = Self::read_tier(tier, &file) {
                trees.push(tree);
                sources.push(file);
            }
        }

        // Merge all tiers
        let merged = merge_all(trees);
        let mut config: Config = serde_json::from_value(merged.to_json())
            .context("merged configuration is invalid")?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config, &env);

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Read one tier's config file. Missing files are skipped silently,
    /// unreadable or malformed ones with a warning.
    fn read_tier(tier: ConfigTier, file: &Path) -> Option<ConfigTree> {
        if !file.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(err) => {
                warn!(tier = %tier, path = %file.display(), error = %err, "Skipping unreadable config file");
                return None;
            }
        };
        match serde_yaml::from_str::<Option<ConfigTree>>(&content) {
            Ok(tree) => {
                debug!(tier = %tier, path = %file.display(), "Loaded config file");
                Some(tree.unwrap_or_default())
            }
            Err(err) => {
                warn!(tier = %tier, path = %file.display(), error = %err, "Skipping malformed config file");
                None
            }
        }
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config, env: &impl Fn(&str) -> Option<String>) {
        if let Some(root) = env("PROFILES_ROOT") {
            config.profiles.root = PathBuf::from(root);
        }

        if let Some(configs_dir) = env("PROFILES_CONFIGS_DIR") {
            config.containers.configs_dir = PathBuf::from(configs_dir);
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}
