//! The set of profiles reachable from requested roots.

use indexmap::IndexMap;
use tracing::debug;

use super::{Profile, ProfileSource};
use crate::error::{ProfileError, Result};

/// Profiles reachable by parent edges from one or more roots.
///
/// Edges point from child to parent. A loaded graph is always acyclic and
/// every declared parent is present.
#[derive(Debug, Clone, Default)]
pub struct ProfileGraph {
    /// Keyed by name, in discovery order.
    profiles: IndexMap<String, Profile>,
    roots: Vec<String>,
}

impl ProfileGraph {
    /// Load every ancestor of `roots` from `source`.
    ///
    /// Root names are normalized first. Fails on a missing profile (naming
    /// the child that declared it) or on a cycle along the current walk.
    pub fn load<S>(source: &S, roots: &[impl AsRef<str>]) -> Result<Self>
    where
        S: ProfileSource + ?Sized,
    {
        let layout = source.layout();
        let roots = roots
            .iter()
            .map(|r| layout.normalize_name(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut graph = Self {
            profiles: IndexMap::new(),
            roots: Vec::new(),
        };
        let mut stack = Vec::new();
        for root in &roots {
            graph.visit(source, root, None, &mut stack)?;
        }
        graph.roots = roots;

        debug!(roots = ?graph.roots, profiles = graph.profiles.len(), "Loaded profile graph");
        Ok(graph)
    }

    fn visit<S>(
        &mut self,
        source: &S,
        name: &str,
        referenced_by: Option<&str>,
        stack: &mut Vec<String>,
    ) -> Result<()>
    where
        S: ProfileSource + ?Sized,
    {
        if let Some(pos) = stack.iter().position(|n| n == name) {
            let mut chain = stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(ProfileError::cycle(chain));
        }
        if self.profiles.contains_key(name) {
            return Ok(());
        }

        let profile = source
            .load(name)?
            .ok_or_else(|| ProfileError::not_found(name, referenced_by))?;
        let parents = profile.parents.clone();
        self.profiles.insert(name.to_string(), profile);

        stack.push(name.to_string());
        for parent in &parents {
            self.visit(source, parent, Some(name), stack)?;
        }
        stack.pop();
        Ok(())
    }

    /// Build a graph from already-loaded profiles, checking it the same way
    /// [`ProfileGraph::load`] does.
    pub fn from_profiles(
        profiles: impl IntoIterator<Item = Profile>,
        roots: &[impl AsRef<str>],
    ) -> Result<Self> {
        let source: super::MemorySource = profiles.into_iter().collect();
        Self::load(&source, roots)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Declared parents of a profile in the graph, left to right.
    pub fn parents(&self, name: &str) -> &[String] {
        self.profiles
            .get(name)
            .map(|p| p.parents.as_slice())
            .unwrap_or_default()
    }

    /// Requested roots, normalized, in caller order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile names in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Cycle;
    use crate::profile::MemorySource;

    fn diamond() -> MemorySource {
        [
            Profile::new("base"),
            Profile::new("left").with_parents(["base"]),
            Profile::new("right").with_parents(["base"]),
            Profile::new("child").with_parents(["left", "right"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_load_collects_all_ancestors_once() {
        let graph = ProfileGraph::load(&diamond(), &["child"]).unwrap();
        assert_eq!(
            graph.names().collect::<Vec<_>>(),
            vec!["child", "left", "base", "right"]
        );
        assert_eq!(graph.parents("child"), ["left", "right"]);
        assert_eq!(graph.roots(), ["child"]);
    }

    #[test]
    fn test_roots_are_normalized() {
        let source: MemorySource = [Profile::new("feature-camel")].into_iter().collect();
        let graph = ProfileGraph::load(&source, &["feature/camel.profile"]).unwrap();
        assert_eq!(graph.roots(), ["feature-camel"]);
    }

    #[test]
    fn test_missing_parent_names_referencing_profile() {
        let source: MemorySource = [Profile::new("child").with_parents(["ghost"])]
            .into_iter()
            .collect();
        let err = ProfileGraph::load(&source, &["child"]).unwrap_err();
        match err {
            ProfileError::ProfileNotFound {
                name,
                referenced_by,
            } => {
                assert_eq!(name, "ghost");
                assert_eq!(referenced_by.as_deref(), Some("child"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_root() {
        let err = ProfileGraph::load(&diamond(), &["nope"]).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::ProfileNotFound { referenced_by: None, .. }
        ));
    }

    #[test]
    fn test_cycle_detected_from_either_root() {
        let source: MemorySource = [
            Profile::new("a").with_parents(["b"]),
            Profile::new("b").with_parents(["a"]),
        ]
        .into_iter()
        .collect();

        for (root, expected) in [("a", ["a", "b", "a"]), ("b", ["b", "a", "b"])] {
            match ProfileGraph::load(&source, &[root]).unwrap_err() {
                ProfileError::CyclicInheritance { cycle: Cycle(chain) } => {
                    assert_eq!(chain, expected);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_cycle_below_entry_point_is_reported_from_its_start() {
        let source: MemorySource = [
            Profile::new("top").with_parents(["a"]),
            Profile::new("a").with_parents(["b"]),
            Profile::new("b").with_parents(["a"]),
        ]
        .into_iter()
        .collect();
        let err = ProfileGraph::load(&source, &["top"]).unwrap_err();
        assert_eq!(err.to_string(), "cyclic profile inheritance: a -> b -> a");
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = ProfileGraph::from_profiles([Profile::new("x").with_parents(["x"])], &["x"])
            .unwrap_err();
        assert!(matches!(err, ProfileError::CyclicInheritance { .. }));
    }
}
