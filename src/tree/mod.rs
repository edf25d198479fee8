//! Nested configuration trees built from flat dotted/bracketed keys.
//!
//! A [`ConfigTree`] is the common representation every structured merge
//! operates on. Flat maps such as `a.b.c=v` and `a.list[2]=v` are converted
//! with [`parse`] and rendered back with [`flatten`]; [`merge`] overlays one
//! tree on another.
//!
//! ## Array holes
//! Setting an index beyond the current length of an array fills the gap
//! with [`ConfigTree::Null`] placeholders, so arrays stay contiguous from 0.
//! Placeholders have no scalar value and are dropped by [`flatten`].
//!
//! ## Merge rules
//! - Objects merge key by key, recursively; keys on one side only are kept
//! - Arrays merge index by index; the longer length wins
//! - An overlay null keeps the base value (null means "not specified")
//! - Any other shape mismatch: the overlay replaces the base subtree
//!
//! ## Scalar kinds
//! Flat keys always produce string scalars. Numbers and booleans read from
//! YAML or JSON documents are kept as [`ConfigTree::Literal`], so documents
//! are written back with their original types. Both kinds flatten to text.

mod path;
pub mod properties;

pub use path::{MAX_ARRAY_INDEX, PathSegment, format_key, parse_key};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;

/// Shape of a tree node, used in conflict reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Null,
    Scalar,
    Array,
    Object,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Null => write!(f, "null"),
            Shape::Scalar => write!(f, "a scalar"),
            Shape::Array => write!(f, "an array"),
            Shape::Object => write!(f, "an object"),
        }
    }
}

/// Errors from building a tree out of flat keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("key {key}: {path} is {found} but must be {expected}")]
    Conflict {
        key: String,
        path: String,
        expected: Shape,
        found: Shape,
    },

    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
}

impl TreeError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// A semantic configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTree {
    /// Explicit placeholder (array hole or document null).
    Null,
    Scalar(String),
    /// A document number or boolean, in its source spelling.
    Literal(String),
    Array(Vec<ConfigTree>),
    /// Keys keep insertion order.
    Object(IndexMap<String, ConfigTree>),
}

impl Default for ConfigTree {
    fn default() -> Self {
        ConfigTree::Object(IndexMap::new())
    }
}

impl From<&str> for ConfigTree {
    fn from(value: &str) -> Self {
        ConfigTree::Scalar(value.to_string())
    }
}

impl From<String> for ConfigTree {
    fn from(value: String) -> Self {
        ConfigTree::Scalar(value)
    }
}

impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigTree::Null => serializer.serialize_unit(),
            ConfigTree::Scalar(s) => serializer.serialize_str(s),
            ConfigTree::Literal(s) => literal_value(s).serialize(serializer),
            ConfigTree::Array(items) => serializer.collect_seq(items),
            ConfigTree::Object(map) => serializer.collect_map(map),
        }
    }
}

/// Typed value of a literal. Spellings JSON cannot express stay strings.
fn literal_value(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => text
            .parse::<Number>()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

impl<'de> Deserialize<'de> for ConfigTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ConfigTree::from_json)
    }
}

impl ConfigTree {
    pub fn shape(&self) -> Shape {
        match self {
            ConfigTree::Null => Shape::Null,
            ConfigTree::Scalar(_) | ConfigTree::Literal(_) => Shape::Scalar,
            ConfigTree::Array(_) => Shape::Array,
            ConfigTree::Object(_) => Shape::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigTree::Null)
    }

    /// Text of a scalar of either kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigTree::Scalar(s) | ConfigTree::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigTree]> {
        match self {
            ConfigTree::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ConfigTree>> {
        match self {
            ConfigTree::Object(map) => Some(map),
            _ => None,
        }
    }

    /// True for an object or array with no entries.
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigTree::Object(map) => map.is_empty(),
            ConfigTree::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Look up a direct child of an object.
    pub fn get(&self, key: &str) -> Option<&ConfigTree> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Navigate by a flat key such as `maven.groupId` or `x[2]`.
    pub fn at(&self, key: &str) -> Option<&ConfigTree> {
        let segments = parse_key(key).ok()?;
        segments.iter().try_fold(self, |node, segment| match (node, segment) {
            (ConfigTree::Object(map), PathSegment::Key(name)) => map.get(name),
            (ConfigTree::Array(items), PathSegment::Index(i)) => items.get(*i),
            _ => None,
        })
    }

    /// Convert a JSON/YAML document value. Numbers and booleans become
    /// literals.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => ConfigTree::Null,
            Value::Bool(b) => ConfigTree::Literal(b.to_string()),
            Value::Number(n) => ConfigTree::Literal(n.to_string()),
            Value::String(s) => ConfigTree::Scalar(s),
            Value::Array(items) => {
                ConfigTree::Array(items.into_iter().map(ConfigTree::from_json).collect())
            }
            Value::Object(map) => ConfigTree::Object(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigTree::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into a JSON value with every scalar as a string, the shape
    /// typed views deserialize from.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigTree::Null => Value::Null,
            ConfigTree::Scalar(s) | ConfigTree::Literal(s) => Value::String(s.clone()),
            ConfigTree::Array(items) => Value::Array(items.iter().map(ConfigTree::to_json).collect()),
            ConfigTree::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert into a JSON value, with literals as numbers and booleans.
    pub fn to_typed_json(&self) -> Value {
        match self {
            ConfigTree::Null => Value::Null,
            ConfigTree::Scalar(s) => Value::String(s.clone()),
            ConfigTree::Literal(s) => literal_value(s),
            ConfigTree::Array(items) => {
                Value::Array(items.iter().map(ConfigTree::to_typed_json).collect())
            }
            ConfigTree::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_typed_json()))
                    .collect(),
            ),
        }
    }
}

/// Build a tree from a flat map of dotted/bracketed keys.
///
/// Fails with [`TreeError::Conflict`] when two keys imply different shapes
/// for the same path, e.g. `a.b=1` together with `a.b[0]=2`.
pub fn parse<K, V>(flat: impl IntoIterator<Item = (K, V)>) -> Result<ConfigTree, TreeError>
where
    K: AsRef<str>,
    V: Into<String>,
{
    let mut root = ConfigTree::default();
    for (key, value) in flat {
        let key = key.as_ref();
        let segments = parse_key(key)?;
        insert(&mut root, key, &segments, value.into())?;
    }
    Ok(root)
}

fn insert(
    root: &mut ConfigTree,
    key: &str,
    segments: &[PathSegment],
    value: String,
) -> Result<(), TreeError> {
    let mut node = root;
    for (depth, segment) in segments.iter().enumerate() {
        node = descend(node, segment, key, &segments[..depth])?;
    }

    if matches!(node, ConfigTree::Null | ConfigTree::Scalar(_) | ConfigTree::Literal(_)) {
        *node = ConfigTree::Scalar(value);
        return Ok(());
    }

    Err(TreeError::Conflict {
        key: key.to_string(),
        path: key.to_string(),
        expected: Shape::Scalar,
        found: node.shape(),
    })
}

/// Step into (creating if needed) the child slot named by `segment`.
fn descend<'a>(
    node: &'a mut ConfigTree,
    segment: &PathSegment,
    key: &str,
    parent: &[PathSegment],
) -> Result<&'a mut ConfigTree, TreeError> {
    let expected = match segment {
        PathSegment::Key(_) => Shape::Object,
        PathSegment::Index(_) => Shape::Array,
    };

    // Holes left by earlier out-of-order indices take whatever shape is needed.
    if node.is_null() {
        *node = match expected {
            Shape::Array => ConfigTree::Array(Vec::new()),
            _ => ConfigTree::default(),
        };
    }

    match (node, segment) {
        (ConfigTree::Object(map), PathSegment::Key(name)) => {
            Ok(map.entry(name.clone()).or_insert(ConfigTree::Null))
        }
        (ConfigTree::Array(items), PathSegment::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, ConfigTree::Null);
            }
            Ok(&mut items[*index])
        }
        (other, _) => Err(TreeError::Conflict {
            key: key.to_string(),
            path: format_key(parent),
            expected,
            found: other.shape(),
        }),
    }
}

/// Render a tree as a flat map. Only scalar leaves produce entries.
pub fn flatten(tree: &ConfigTree) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    let mut prefix = Vec::new();
    flatten_into(tree, &mut prefix, &mut out);
    out
}

fn flatten_into(
    node: &ConfigTree,
    prefix: &mut Vec<PathSegment>,
    out: &mut IndexMap<String, String>,
) {
    match node {
        ConfigTree::Null => {}
        ConfigTree::Scalar(value) | ConfigTree::Literal(value) => {
            out.insert(format_key(prefix), value.clone());
        }
        ConfigTree::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                prefix.push(PathSegment::Index(index));
                flatten_into(item, prefix, out);
                prefix.pop();
            }
        }
        ConfigTree::Object(map) => {
            for (name, child) in map {
                prefix.push(PathSegment::Key(name.clone()));
                flatten_into(child, prefix, out);
                prefix.pop();
            }
        }
    }
}

/// Deep merge two trees, with `overlay` taking precedence over `base`.
///
/// # Example
/// ```
/// use profile_materializer::tree::{flatten, merge, parse};
///
/// let base = parse([("server.port", "8080"), ("server.host", "localhost")]).unwrap();
/// let overlay = parse([("server.port", "9000")]).unwrap();
/// let merged = flatten(&merge(base, overlay));
/// assert_eq!(merged["server.port"], "9000");
/// assert_eq!(merged["server.host"], "localhost");
/// ```
pub fn merge(base: ConfigTree, overlay: ConfigTree) -> ConfigTree {
    match (base, overlay) {
        // Both are objects: merge recursively, keeping base key order
        (ConfigTree::Object(mut base_map), ConfigTree::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = std::mem::take(slot);
                        *slot = merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            ConfigTree::Object(base_map)
        }
        // Both are arrays: merge element by element
        (ConfigTree::Array(mut base_items), ConfigTree::Array(overlay_items)) => {
            for (index, overlay_value) in overlay_items.into_iter().enumerate() {
                if let Some(slot) = base_items.get_mut(index) {
                    let base_value = std::mem::take(slot);
                    *slot = merge(base_value, overlay_value);
                } else {
                    base_items.push(overlay_value);
                }
            }
            ConfigTree::Array(base_items)
        }
        // Overlay is null: preserve base
        (base, ConfigTree::Null) => base,
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

/// Merge multiple trees in order, with later trees taking precedence.
pub fn merge_all(trees: impl IntoIterator<Item = ConfigTree>) -> ConfigTree {
    trees.into_iter().fold(ConfigTree::Null, merge)
}
