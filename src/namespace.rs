//! Typed views over top-level namespaces of a merged tree.
//!
//! Generators read their settings from well-known namespaces such as
//! `maven.groupId` or `container.profiles` instead of parsing files again.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ProfileError, Result};
use crate::tree::ConfigTree;

/// A typed value stored under one top-level key of a [`ConfigTree`].
pub trait ConfigNamespace: DeserializeOwned {
    /// Top-level key holding this namespace.
    const NAMESPACE: &'static str;
}

impl ConfigTree {
    /// Deserialize the `T::NAMESPACE` subtree. Missing or null subtrees read
    /// as an empty object.
    pub fn namespace<T: ConfigNamespace>(&self) -> Result<T> {
        let value = match self.get(T::NAMESPACE) {
            Some(subtree) if !subtree.is_null() => subtree.to_json(),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        };
        serde_json::from_value(value).map_err(|err| ProfileError::Namespace {
            namespace: T::NAMESPACE,
            file: String::new(),
            message: err.to_string(),
        })
    }
}

/// Project coordinates for generated builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenConfig {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

impl ConfigNamespace for MavenConfig {
    const NAMESPACE: &'static str = "maven";
}

/// What a container is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    pub name: Option<String>,
    /// Reifier types to run, in order.
    #[serde(default, deserialize_with = "whitespace_list")]
    pub container_type: Vec<String>,
    /// Profiles to materialize, least specific first.
    #[serde(default, deserialize_with = "whitespace_list")]
    pub profiles: Vec<String>,
}

impl ConfigNamespace for ContainerConfig {
    const NAMESPACE: &'static str = "container";
}

/// Remote repository and revision the profiles came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    pub git_remote_uri_pattern: Option<String>,
    pub git_remote_uri: Option<String>,
    pub git_remote_name: Option<String>,
    pub current_version: Option<String>,
    pub current_commit_id: Option<String>,
}

impl ConfigNamespace for GitConfig {
    const NAMESPACE: &'static str = "git";
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    List(Vec<Option<String>>),
}

/// Accept `"a b c"` as well as `[a, b, c]`.
fn whitespace_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::String(s)) => s.split_whitespace().map(str::to_string).collect(),
        Some(StringOrList::List(items)) => items
            .into_iter()
            .flatten()
            .flat_map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect(),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    #[test]
    fn test_container_lists_from_whitespace_string() {
        let tree = parse([
            ("container.profiles", "base  feature-camel"),
            ("container.containerType", "fabric8-resources"),
            ("container.name", "web"),
        ])
        .unwrap();
        let container: ContainerConfig = tree.namespace().unwrap();
        assert_eq!(container.profiles, vec!["base", "feature-camel"]);
        assert_eq!(container.container_type, vec!["fabric8-resources"]);
        assert_eq!(container.name.as_deref(), Some("web"));
    }

    #[test]
    fn test_container_lists_from_array_with_holes() {
        let tree = parse([("container.profiles[0]", "a"), ("container.profiles[2]", "c")]).unwrap();
        let container: ContainerConfig = tree.namespace().unwrap();
        assert_eq!(container.profiles, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_namespace_is_empty() {
        let maven: MavenConfig = ConfigTree::default().namespace().unwrap();
        assert_eq!(maven, MavenConfig::default());
    }

    #[test]
    fn test_maven_camel_case_keys() {
        let tree = parse([("maven.groupId", "io.example"), ("maven.version", "1.0")]).unwrap();
        let maven: MavenConfig = tree.namespace().unwrap();
        assert_eq!(maven.group_id.as_deref(), Some("io.example"));
        assert_eq!(maven.version.as_deref(), Some("1.0"));
        assert!(maven.artifact_id.is_none());
    }

    #[test]
    fn test_git_namespace() {
        let tree = parse([
            ("git.gitRemoteUri", "https://example.com/repo.git"),
            ("git.currentCommitId", "abc123"),
        ])
        .unwrap();
        let git: GitConfig = tree.namespace().unwrap();
        assert_eq!(git.git_remote_uri.as_deref(), Some("https://example.com/repo.git"));
        assert_eq!(git.current_commit_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_wrong_shape_is_namespace_error() {
        let tree = parse([("maven.groupId.nested", "x")]).unwrap();
        let err = tree.namespace::<MavenConfig>().unwrap_err();
        assert!(matches!(err, ProfileError::Namespace { namespace: "maven", .. }));
    }
}
