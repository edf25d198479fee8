//! Linearizing a profile graph into a merge sequence.
//!
//! The sequence is the postorder of a depth-first walk that starts from each
//! root in caller order and visits declared parents left to right. A profile
//! is emitted only after every one of its ancestors, on every path, has been
//! emitted, so a shared ancestor in a diamond appears once and early.
//!
//! ## Sibling tie-break
//! For `child: parents = "left right"`, the lineage of `right` (everything
//! reachable from `right` that `left` does not already reach) is emitted
//! after all of `left`'s lineage. Later entries win conflicts, so a
//! later-declared parent overrides an earlier one, recursively. Across
//! several requested roots the same rule applies to caller order.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{ProfileError, Result};
use crate::profile::ProfileGraph;

/// Ordered profile names, least specific first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergeSequence {
    /// Every profile exactly once, after all of its ancestors.
    pub order: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl MergeSequence {
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }

    /// Resolve the merge sequence for `roots` within `graph`.
    ///
    /// Every root must be in the graph. Cycles are rejected even for graphs
    /// not produced by [`ProfileGraph::load`].
    pub fn resolve(graph: &ProfileGraph, roots: &[impl AsRef<str>]) -> Result<Self> {
        let mut marks = HashMap::with_capacity(graph.len());
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(graph.len());

        for root in roots {
            let root = root.as_ref();
            let profile = graph
                .get(root)
                .ok_or_else(|| ProfileError::not_found(root, None))?;
            visit(graph, &profile.name, None, &mut marks, &mut stack, &mut order)?;
        }

        Ok(Self { order })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of a profile in the sequence.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }
}

fn visit<'g>(
    graph: &'g ProfileGraph,
    name: &'g str,
    referenced_by: Option<&str>,
    marks: &mut HashMap<&'g str, Mark>,
    stack: &mut Vec<&'g str>,
    order: &mut Vec<String>,
) -> Result<()> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|n| *n == name).unwrap_or(0);
            let mut chain: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
            chain.push(name.to_string());
            return Err(ProfileError::cycle(chain));
        }
        None => {}
    }

    let profile = graph
        .get(name)
        .ok_or_else(|| ProfileError::not_found(name, referenced_by))?;

    marks.insert(name, Mark::Visiting);
    stack.push(name);
    for parent in &profile.parents {
        visit(graph, parent, Some(name), marks, stack, order)?;
    }
    stack.pop();
    marks.insert(name, Mark::Done);
    order.push(name.to_string());
    Ok(())
}

impl<'a> IntoIterator for &'a MergeSequence {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
