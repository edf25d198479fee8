//! Dotted and bracketed key paths such as `a.b[2].c`.

use regex_lite::Regex;
use std::sync::LazyLock;

use super::TreeError;

/// Largest array index a key may address.
pub const MAX_ARRAY_INDEX: usize = 65_535;

/// A segment name followed by one or more `[n]` groups at its end. Indices
/// are written without leading zeros.
static INDEX_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)((?:\[(?:0|[1-9][0-9]*)\])+)$").expect("index suffix pattern")
});

static INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(0|[1-9][0-9]*)\]").expect("index pattern"));

/// One step of a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Split a flat key into path segments.
///
/// Segments are separated by `.`; a segment may end in one or more `[n]`
/// groups addressing array elements. Bracket text anywhere else is part of
/// the segment name, so `bundle.range[1,2)` is a plain two-level key. So is
/// a zero-padded group: `x[01]` names a key, never the slot `x[1]`.
pub fn parse_key(key: &str) -> Result<Vec<PathSegment>, TreeError> {
    let mut segments = Vec::new();

    for part in key.split('.') {
        if part.is_empty() {
            return Err(TreeError::invalid_key(key, "empty path segment"));
        }

        let Some(caps) = INDEX_SUFFIX.captures(part) else {
            segments.push(PathSegment::Key(part.to_string()));
            continue;
        };

        let name = caps.get(1).map_or("", |m| m.as_str());
        if name.is_empty() {
            return Err(TreeError::invalid_key(key, "array index without a name"));
        }
        segments.push(PathSegment::Key(name.to_string()));

        let suffix = caps.get(2).map_or("", |m| m.as_str());
        for index in INDEX.captures_iter(suffix) {
            let digits = index.get(1).map_or("", |m| m.as_str());
            let value = digits
                .parse::<usize>()
                .ok()
                .filter(|n| *n <= MAX_ARRAY_INDEX)
                .ok_or_else(|| {
                    TreeError::invalid_key(
                        key,
                        format!("array index {} exceeds {}", digits, MAX_ARRAY_INDEX),
                    )
                })?;
            segments.push(PathSegment::Index(value));
        }
    }

    Ok(segments)
}

/// Render path segments back into flat key notation.
pub fn format_key(segments: &[PathSegment]) -> String {
    let mut key = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(name) => {
                if !key.is_empty() {
                    key.push('.');
                }
                key.push_str(name);
            }
            PathSegment::Index(index) => {
                key.push('[');
                key.push_str(&index.to_string());
                key.push(']');
            }
        }
    }
    key
}
