//! Profiles: named, inheritable bundles of configuration files.
//!
//! A profile is read-only input. Each one carries the parent names declared
//! in its declarations file and the raw bytes of every file it contributes.
//! Profiles come from a [`ProfileSource`]: [`DirectorySource`] reads them from
//! a profile root on disk, [`MemorySource`] holds them in memory so the merge
//! phase can be exercised without any filesystem fixture.

mod directory;
mod graph;

pub use directory::DirectorySource;
pub use graph::ProfileGraph;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};
use crate::tree::properties::parse_properties;

pub const DEFAULT_SUFFIX: &str = ".profile";
pub const DEFAULT_SEPARATOR: char = '-';
pub const DEFAULT_DECLARATIONS_FILE: &str = "io.fabric8.agent.properties";
pub const DEFAULT_PARENTS_KEY: &str = "attribute.parents";
pub const DEFAULT_PROFILE: &str = "default";

/// On-disk naming conventions for a profile root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileLayout {
    /// Directory name suffix marking a profile.
    pub suffix: String,
    /// Delimiter that replaces path separators in hierarchical names.
    pub separator: char,
    /// Reserved file holding the parent declarations.
    pub declarations_file: String,
    /// Key in the declarations file listing parents, whitespace-separated.
    pub parents_key: String,
}

impl Default for ProfileLayout {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            separator: DEFAULT_SEPARATOR,
            declarations_file: DEFAULT_DECLARATIONS_FILE.to_string(),
            parents_key: DEFAULT_PARENTS_KEY.to_string(),
        }
    }
}

impl ProfileLayout {
    /// True when a directory name marks a profile.
    pub fn is_profile_dir(&self, dir_name: &str) -> bool {
        dir_name.len() > self.suffix.len() && dir_name.ends_with(&self.suffix)
    }

    /// Normalize a user- or file-supplied profile name.
    ///
    /// Path separators become the delimiter and a trailing suffix on any
    /// segment is dropped, so `a/b.profile` and `a-b` name the same profile.
    pub fn normalize_name(&self, raw: &str) -> Result<String> {
        let segments: Vec<&str> = raw
            .trim()
            .split(['/', '\\', self.separator])
            .map(|segment| segment.strip_suffix(self.suffix.as_str()).unwrap_or(segment))
            .collect();

        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(ProfileError::InvalidProfileName {
                name: raw.to_string(),
            });
        }

        Ok(segments.join(&self.separator.to_string()))
    }

    /// Hierarchical name for a profile directory, given its path components
    /// relative to the profile root.
    pub fn name_from_components<'a>(
        &self,
        components: impl IntoIterator<Item = &'a str>,
    ) -> String {
        components
            .into_iter()
            .map(|c| c.strip_suffix(self.suffix.as_str()).unwrap_or(c))
            .collect::<Vec<_>>()
            .join(&self.separator.to_string())
    }

    /// Parent names listed in declarations file text.
    pub fn parse_parents(&self, text: &str) -> Result<Vec<String>> {
        let entries = parse_properties(text).map_err(|err| {
            ProfileError::document("(declarations)", &self.declarations_file, err)
        })?;
        entries
            .get(&self.parents_key)
            .map(|value| {
                value
                    .split_whitespace()
                    .map(|name| self.normalize_name(name))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// One file contributed by a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFile {
    /// Path relative to the profile directory, `/`-separated.
    pub path: String,
    pub contents: Vec<u8>,
}

impl ProfileFile {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// A loaded profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// Declared parents, left to right.
    pub parents: Vec<String>,
    /// Contributed files, sorted by path.
    pub files: Vec<ProfileFile>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.push(ProfileFile::new(path, contents));
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self
    }

    /// Build a profile from its files, reading parents from the declarations file.
    pub fn from_files(name: String, mut files: Vec<ProfileFile>, layout: &ProfileLayout) -> Result<Self> {
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let parents = match files.iter().find(|f| f.path == layout.declarations_file) {
            Some(declarations) => {
                let text = crate::merge::decode_text(&declarations.contents);
                layout.parse_parents(&text).map_err(|err| match err {
                    ProfileError::Document { file, message, .. } => ProfileError::Document {
                        profile: name.clone(),
                        file,
                        message,
                    },
                    other => other,
                })?
            }
            None => Vec::new(),
        };

        Ok(Self {
            name,
            parents,
            files,
        })
    }

    pub fn file(&self, path: &str) -> Option<&ProfileFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Where profiles are loaded from.
pub trait ProfileSource {
    /// Conventions used to name and parse profiles.
    fn layout(&self) -> &ProfileLayout;

    /// Load a profile by normalized name; `None` when no such profile exists.
    fn load(&self, name: &str) -> Result<Option<Profile>>;

    /// Every profile name this source knows, sorted.
    fn names(&self) -> Result<Vec<String>>;

    /// Profile names starting with `prefix` (all when `None`).
    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let names = self.names()?;
        Ok(match prefix {
            Some(prefix) => names.into_iter().filter(|n| n.starts_with(prefix)).collect(),
            None => names,
        })
    }
}

/// In-memory profile set.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    layout: ProfileLayout,
    profiles: IndexMap<String, Profile>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: ProfileLayout) -> Self {
        Self {
            layout,
            profiles: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, profile: Profile) -> &mut Self {
        self.profiles.insert(profile.name.clone(), profile);
        self
    }

    pub fn with(mut self, profile: Profile) -> Self {
        self.insert(profile);
        self
    }
}

impl FromIterator<Profile> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        let mut source = MemorySource::new();
        for profile in iter {
            source.insert(profile);
        }
        source
    }
}

impl ProfileSource for MemorySource {
    fn layout(&self) -> &ProfileLayout {
        &self.layout
    }

    fn load(&self, name: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.get(name).cloned())
    }

    fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_variants() {
        let layout = ProfileLayout::default();
        assert_eq!(layout.normalize_name("a-b").unwrap(), "a-b");
        assert_eq!(layout.normalize_name("a/b").unwrap(), "a-b");
        assert_eq!(layout.normalize_name(" a/b.profile ").unwrap(), "a-b");
        assert_eq!(layout.normalize_name("a.profile/b.profile").unwrap(), "a-b");
    }

    #[test]
    fn test_normalize_name_rejects_empty_segments() {
        let layout = ProfileLayout::default();
        assert!(layout.normalize_name("").is_err());
        assert!(layout.normalize_name("a//b").is_err());
        assert!(layout.normalize_name("-a").is_err());
    }

    #[test]
    fn test_name_from_components() {
        let layout = ProfileLayout::default();
        assert_eq!(
            layout.name_from_components(["feature", "camel.profile"]),
            "feature-camel"
        );
    }

    #[test]
    fn test_is_profile_dir() {
        let layout = ProfileLayout::default();
        assert!(layout.is_profile_dir("base.profile"));
        assert!(!layout.is_profile_dir(".profile"));
        assert!(!layout.is_profile_dir("base"));
    }

    #[test]
    fn test_parse_parents_whitespace_separated() {
        let layout = ProfileLayout::default();
        let parents = layout
            .parse_parents("attribute.parents = left  right\tfeature/camel\nfeature.x=1\n")
            .unwrap();
        assert_eq!(parents, vec!["left", "right", "feature-camel"]);
        assert!(layout.parse_parents("other=1").unwrap().is_empty());
    }

    #[test]
    fn test_from_files_reads_declarations() {
        let layout = ProfileLayout::default();
        let profile = Profile::from_files(
            "child".to_string(),
            vec![
                ProfileFile::new("readme.md", "hi"),
                ProfileFile::new(DEFAULT_DECLARATIONS_FILE, "attribute.parents=base\n"),
            ],
            &layout,
        )
        .unwrap();
        assert_eq!(profile.parents, vec!["base"]);
        assert_eq!(profile.files[0].path, DEFAULT_DECLARATIONS_FILE);
    }

    #[test]
    fn test_memory_source_list_by_prefix() {
        let source: MemorySource = [
            Profile::new("feature-camel"),
            Profile::new("feature-cxf"),
            Profile::new("base"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            source.list(Some("feature")).unwrap(),
            vec!["feature-camel", "feature-cxf"]
        );
        assert_eq!(source.list(None).unwrap().len(), 3);
    }
}
