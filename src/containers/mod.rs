//! Containers: named profile selections handed to project reifiers.
//!
//! A container definition lives at `<configs>/containers/<name>.<ext>` and
//! carries a `container` namespace listing its profiles and container types.
//! Reifying a container materializes its profiles into `<target>/.profiles`
//! and runs the reifier registered for each of its types.

mod registry;
mod resources;

pub use registry::{ReifierFactory, ReifierRegistry};
pub use resources::{
    CONTAINER_PROPERTIES, RESOURCES_CONTAINER_TYPE, RESOURCES_PATH, ResourcesReifier,
};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ProfileError, Result};
use crate::materialize::{MaterializedConfig, Materializer};
use crate::merge::{FileKind, decode_document};
use crate::namespace::ContainerConfig;
use crate::profile::{DEFAULT_PROFILE, DirectorySource, ProfileFile, ProfileSource};
use crate::tree::ConfigTree;

/// Directory under the configs root holding container definitions.
pub const CONTAINERS_DIR: &str = "containers";

/// Directory under a container target receiving its materialized profiles.
pub const MATERIALIZED_PROFILES_DIR: &str = ".profiles";

/// Definition file extensions, in lookup order.
const DEFINITION_EXTENSIONS: [&str; 5] = ["cfg", "properties", "yaml", "yml", "json"];

/// Generates a project from a materialized container.
pub trait ProjectReifier {
    /// Write the project for one container into `target`.
    ///
    /// `config` is the container definition; `materialized` holds its merged
    /// profiles, already written under `target`.
    fn reify(&self, target: &Path, config: &ConfigTree, materialized: &MaterializedConfig) -> Result<()>;
}

/// Container definitions plus everything needed to reify them.
pub struct Containers<S = DirectorySource> {
    configs_dir: PathBuf,
    registry: ReifierRegistry,
    materializer: Materializer<S>,
    default_type: Vec<String>,
}

impl<S: ProfileSource> Containers<S> {
    pub fn new(
        configs_dir: impl Into<PathBuf>,
        registry: ReifierRegistry,
        materializer: Materializer<S>,
    ) -> Self {
        Self {
            configs_dir: configs_dir.into(),
            registry,
            materializer,
            default_type: vec![RESOURCES_CONTAINER_TYPE.to_string()],
        }
    }

    /// Container types used when a definition names none.
    pub fn with_default_type<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.default_type = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn registry(&self) -> &ReifierRegistry {
        &self.registry
    }

    fn definitions_dir(&self) -> PathBuf {
        self.configs_dir.join(CONTAINERS_DIR)
    }

    /// Names of every defined container, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = self.definitions_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries =
            std::fs::read_dir(&dir).map_err(|err| ProfileError::io("read directory", &dir, err))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ProfileError::io("read directory", &dir, err))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|e| e.to_str()),
            ) else {
                continue;
            };
            if DEFINITION_EXTENSIONS.contains(&ext) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load a container definition as a tree.
    pub fn load(&self, name: &str) -> Result<ConfigTree> {
        let dir = self.definitions_dir();
        for ext in DEFINITION_EXTENSIONS {
            let file_name = format!("{name}.{ext}");
            let path = dir.join(&file_name);
            if !path.is_file() {
                continue;
            }
            let contents =
                std::fs::read(&path).map_err(|err| ProfileError::io("read", &path, err))?;
            debug!(container = %name, path = %path.display(), "Loading container definition");
            let file = ProfileFile::new(format!("{CONTAINERS_DIR}/{file_name}"), contents);
            return decode_document(FileKind::classify(&file_name), name, &file, None);
        }
        Err(ProfileError::ContainerNotFound {
            name: name.to_string(),
            configs_dir: self.configs_dir.clone(),
        })
    }

    /// Materialize a container's profiles under `target` and run its reifiers.
    pub fn reify(&self, target: &Path, name: &str) -> Result<MaterializedConfig> {
        let config = self.load(name)?;
        let container: ContainerConfig = config.namespace()?;

        let types = if container.container_type.is_empty() {
            self.default_type.clone()
        } else {
            container.container_type.clone()
        };
        let reifiers = types
            .iter()
            .map(|t| {
                self.registry
                    .create(t)
                    .ok_or_else(|| ProfileError::UnknownContainerType {
                        container: name.to_string(),
                        container_type: t.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let profiles = if container.profiles.is_empty() {
            vec![DEFAULT_PROFILE.to_string()]
        } else {
            container.profiles.clone()
        };

        std::fs::create_dir_all(target)
            .map_err(|err| ProfileError::io("create container directory", target, err))?;
        let profiles_dir = target.join(MATERIALIZED_PROFILES_DIR);
        if profiles_dir.exists() {
            std::fs::remove_dir_all(&profiles_dir)
                .map_err(|err| ProfileError::io("remove", &profiles_dir, err))?;
        }

        info!(container = %name, profiles = ?profiles, types = ?types, "Reifying container");
        let materialized = self.materializer.materialize(&profiles_dir, profiles.as_slice())?;
        for reifier in &reifiers {
            reifier.reify(target, &config, &materialized)?;
        }
        Ok(materialized)
    }
}
