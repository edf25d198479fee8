//! Materialization: profiles in, one merged configuration directory out.
//!
//! Work happens in three phases:
//! 1. read: load the profile graph and resolve the merge sequence
//! 2. compute: merge every contributed file in sequence order, in memory
//! 3. write: serialize the merged files into the target directory
//!
//! The compute phase ([`merge_profiles`]) touches no filesystem. The target
//! is checked and created before anything else, and nothing is written to
//! it until every file has merged and encoded, so any graph or content error
//! leaves it empty.

use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ProfileError, Result};
use crate::merge::{FileMerger, MergedFile};
use crate::namespace::ConfigNamespace;
use crate::order::MergeSequence;
use crate::profile::{DirectorySource, ProfileGraph, ProfileLayout, ProfileSource};
use crate::tree::{self, ConfigTree};

/// Resolves and merges profiles from a source.
#[derive(Debug, Clone)]
pub struct Materializer<S = DirectorySource> {
    source: S,
}

impl Materializer<DirectorySource> {
    /// Materializer over a profile root on disk.
    pub fn open(root: impl Into<PathBuf>, layout: ProfileLayout) -> Result<Self> {
        Ok(Self::new(DirectorySource::open(root, layout)?))
    }
}

impl<S: ProfileSource> Materializer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the graph for `roots` and linearize it.
    pub fn resolve(&self, roots: &[impl AsRef<str>]) -> Result<(ProfileGraph, MergeSequence)> {
        let graph = ProfileGraph::load(&self.source, roots)?;
        let sequence = MergeSequence::resolve(&graph, graph.roots())?;
        Ok((graph, sequence))
    }

    /// Merge `roots` in memory without writing anything.
    pub fn compute(&self, roots: &[impl AsRef<str>]) -> Result<MergedProfiles> {
        let (graph, sequence) = self.resolve(roots)?;
        merge_profiles(&graph, sequence, self.source.layout())
    }

    /// Materialize `roots` into `target`, which must be empty or absent.
    pub fn materialize(
        &self,
        target: impl AsRef<Path>,
        roots: &[impl AsRef<str>],
    ) -> Result<MaterializedConfig> {
        let target = target.as_ref();
        prepare_target(target)?;

        let merged = self.compute(roots)?;
        info!(
            target = %target.display(),
            sequence = ?merged.sequence.as_slice(),
            files = merged.files.len(),
            "Materializing profiles"
        );
        merged.write_to(target)
    }
}

/// Merge every profile of `sequence` (least specific first) into one file set.
pub fn merge_profiles(
    graph: &ProfileGraph,
    sequence: MergeSequence,
    layout: &ProfileLayout,
) -> Result<MergedProfiles> {
    let mut merger = FileMerger::new(layout.clone());
    for name in &sequence {
        let profile = graph
            .get(name)
            .ok_or_else(|| ProfileError::not_found(name.as_str(), None))?;
        debug!(profile = %name, files = profile.files.len(), "Applying profile");
        merger.add_profile(profile)?;
    }

    let files = merger.finish();
    for path in files.keys() {
        validate_output_path(path)?;
    }
    Ok(MergedProfiles { sequence, files })
}

/// In-memory result of the compute phase.
#[derive(Debug, Clone)]
pub struct MergedProfiles {
    pub sequence: MergeSequence,
    /// Output files keyed by relative path, sorted.
    pub files: IndexMap<String, MergedFile>,
}

impl MergedProfiles {
    /// Encode every file, then write them under `target`.
    ///
    /// `target` must already exist.
    pub fn write_to(self, target: &Path) -> Result<MaterializedConfig> {
        let mut encoded = Vec::with_capacity(self.files.len());
        for file in self.files.values() {
            encoded.push((file.path.as_str(), file.encode()?));
        }

        for (path, bytes) in &encoded {
            let full = target.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| ProfileError::io("create directory", parent, err))?;
            }
            std::fs::write(&full, bytes).map_err(|err| ProfileError::io("write", &full, err))?;
            debug!(path = %path, bytes = bytes.len(), "Wrote merged file");
        }

        Ok(MaterializedConfig {
            target: target.to_path_buf(),
            sequence: self.sequence,
            files: self.files,
        })
    }
}

/// Make sure `target` is an empty directory, creating it if needed.
fn prepare_target(target: &Path) -> Result<()> {
    if target.exists() {
        if !target.is_dir() {
            return Err(ProfileError::InvalidPath {
                path: target.display().to_string(),
                reason: "target exists and is not a directory",
            });
        }
        let mut entries = std::fs::read_dir(target)
            .map_err(|err| ProfileError::io("read target directory", target, err))?;
        if entries.next().is_some() {
            return Err(ProfileError::TargetNotEmpty {
                path: target.to_path_buf(),
            });
        }
        return Ok(());
    }
    std::fs::create_dir_all(target)
        .map_err(|err| ProfileError::io("create target directory", target, err))
}

/// Output paths must stay inside the target directory.
fn validate_output_path(path: &str) -> Result<()> {
    let invalid = |reason| ProfileError::InvalidPath {
        path: path.to_string(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("empty path"));
    }
    if path.split('/').any(str::is_empty) {
        return Err(invalid("empty path component"));
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => {}
            Component::ParentDir => return Err(invalid("path escapes the target directory")),
            Component::CurDir => return Err(invalid("path contains '.'")),
            Component::RootDir | Component::Prefix(_) => return Err(invalid("absolute path")),
        }
    }
    Ok(())
}

/// A materialized configuration: the directory written and its merged trees.
#[derive(Debug, Clone)]
pub struct MaterializedConfig {
    target: PathBuf,
    sequence: MergeSequence,
    files: IndexMap<String, MergedFile>,
}

impl MaterializedConfig {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn sequence(&self) -> &MergeSequence {
        &self.sequence
    }

    /// Every output file, sorted by path.
    pub fn files(&self) -> impl Iterator<Item = &MergedFile> {
        self.files.values()
    }

    pub fn file(&self, path: &str) -> Option<&MergedFile> {
        self.files.get(path)
    }

    /// Merged tree of a structured file.
    pub fn tree(&self, path: &str) -> Option<&ConfigTree> {
        self.files.get(path).and_then(MergedFile::tree)
    }

    /// Every structured file's merged tree, keyed by path.
    pub fn trees(&self) -> impl Iterator<Item = (&str, &ConfigTree)> {
        self.files
            .values()
            .filter_map(|file| file.tree().map(|tree| (file.path.as_str(), tree)))
    }

    /// Flat key/value view of a structured file.
    pub fn flat(&self, path: &str) -> Option<IndexMap<String, String>> {
        self.tree(path).map(tree::flatten)
    }

    /// Profiles that contributed to a file, in merge order.
    pub fn contributors(&self, path: &str) -> Option<&[String]> {
        self.files.get(path).map(|file| file.contributors.as_slice())
    }

    /// Typed view of one namespace of a structured file.
    ///
    /// A missing file or namespace yields the namespace's empty value.
    pub fn namespace<T: ConfigNamespace>(&self, path: &str) -> Result<T> {
        match self.tree(path) {
            Some(tree) => tree.namespace::<T>().map_err(|err| match err {
                ProfileError::Namespace {
                    namespace, message, ..
                } => ProfileError::Namespace {
                    namespace,
                    file: path.to_string(),
                    message,
                },
                other => other,
            }),
            None => ConfigTree::default().namespace::<T>(),
        }
    }
}
