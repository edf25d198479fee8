//! Profiles stored as `*.profile` directories under a profile root.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{Profile, ProfileFile, ProfileLayout, ProfileSource};
use crate::error::{ProfileError, Result};

/// Profile root on disk, indexed once at open time.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    layout: ProfileLayout,
    /// Profile name -> profile directory.
    index: IndexMap<String, PathBuf>,
}

impl DirectorySource {
    /// Scan `root` for profile directories.
    pub fn open(root: impl Into<PathBuf>, layout: ProfileLayout) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ProfileError::io(
                "read profile root",
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut index: IndexMap<String, PathBuf> = IndexMap::new();
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| walk_error(&root, err))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(dir_name) = entry.file_name().to_str() else {
                continue;
            };
            if !layout.is_profile_dir(dir_name) {
                continue;
            }

            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            let components: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let name = layout.name_from_components(components.iter().map(String::as_str));

            if let Some(existing) = index.get(&name) {
                warn!(
                    profile = %name,
                    kept = %existing.display(),
                    ignored = %entry.path().display(),
                    "Two directories map to the same profile name"
                );
                continue;
            }
            index.insert(name, entry.path().to_path_buf());
        }

        debug!(root = %root.display(), profiles = index.len(), "Indexed profile root");
        Ok(Self { root, layout, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a profile, if it exists.
    pub fn profile_dir(&self, name: &str) -> Option<&Path> {
        self.index.get(name).map(PathBuf::as_path)
    }

    fn read_files(&self, dir: &Path) -> Result<Vec<ProfileFile>> {
        let layout = &self.layout;
        let mut files = Vec::new();

        // symlinks are not followed, so nothing outside the profile is read
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            // nested profiles are contributions of their own, not of this one
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(|n| layout.is_profile_dir(n)))
            });

        for entry in walker {
            let entry = entry.map_err(|err| walk_error(dir, err))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let contents = std::fs::read(entry.path())
                .map_err(|err| ProfileError::io("read profile file", entry.path(), err))?;
            files.push(ProfileFile { path, contents });
        }

        Ok(files)
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> ProfileError {
    let path = err.path().unwrap_or(root).to_path_buf();
    ProfileError::io("walk", path, std::io::Error::from(err))
}

impl ProfileSource for DirectorySource {
    fn layout(&self) -> &ProfileLayout {
        &self.layout
    }

    fn load(&self, name: &str) -> Result<Option<Profile>> {
        let Some(dir) = self.index.get(name) else {
            return Ok(None);
        };
        let files = self.read_files(dir)?;
        debug!(profile = %name, files = files.len(), "Loaded profile");
        Profile::from_files(name.to_string(), files, &self.layout).map(Some)
    }

    fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.index.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
