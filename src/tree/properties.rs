//! Reader and writer for flat `key=value` property files.
//!
//! Follows the `.properties` line format: `#`/`!` comments, `=`, `:` or
//! whitespace separators, backslash line continuations and `\uXXXX` escapes.
//! The writer never emits a timestamp header so output is stable across runs.

use indexmap::IndexMap;

/// Malformed `\uXXXX` escape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed \\uXXXX escape on line {line}")]
pub struct MalformedEscape {
    pub line: usize,
}

/// Parse property file text into an ordered flat map. Later duplicates win.
pub fn parse_properties(text: &str) -> Result<IndexMap<String, String>, MalformedEscape> {
    let mut entries = IndexMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim_start_matches([' ', '\t', '\x0c']);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = String::from(trimmed);
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches([' ', '\t', '\x0c'])),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let line_no = index + 1;
        entries.insert(unescape(key, line_no)?, unescape(value, line_no)?);
    }

    Ok(entries)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }
    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, MalformedEscape> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = (hex.len() == 4)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or(MalformedEscape { line })?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

/// Render ordered entries as property file text.
pub fn write_properties<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }
    out
}

fn escape_into(out: &mut String, text: &str, is_key: bool) {
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_and_comments() {
        let text = "# comment\n! also comment\n\na=1\nb : 2\nc 3\n  d=\n";
        let map = parse_properties(text).unwrap();
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
        assert_eq!(map.get("b").map(String::as_str), Some("2"));
        assert_eq!(map.get("c").map(String::as_str), Some("3"));
        assert_eq!(map.get("d").map(String::as_str), Some(""));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_line_continuation() {
        let text = "list=one,\\\n    two,\\\n    three\nnext=x\n";
        let map = parse_properties(text).unwrap();
        assert_eq!(map["list"], "one,two,three");
        assert_eq!(map["next"], "x");
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let map = parse_properties("path=c:\\\\\nnext=x\n").unwrap();
        assert_eq!(map["path"], "c:\\");
        assert_eq!(map["next"], "x");
    }

    #[test]
    fn test_escapes_in_keys_and_values() {
        let map = parse_properties("a\\=b=c\\:d\nu=\\u0041\\n\n").unwrap();
        assert_eq!(map["a=b"], "c:d");
        assert_eq!(map["u"], "A\n");
    }

    #[test]
    fn test_malformed_unicode_escape() {
        assert_eq!(
            parse_properties("ok=1\nbad=\\u00zz\n"),
            Err(MalformedEscape { line: 2 })
        );
    }

    #[test]
    fn test_later_duplicate_wins_keeping_first_position() {
        let map = parse_properties("a=1\nb=2\na=3\n").unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map["a"], "3");
    }

    #[test]
    fn test_writer_output_reads_back() {
        let entries = [
            ("plain", "value"),
            ("with space", " leading and = colon: #hash"),
            ("url", "mvn:org.example/artifact/1.0"),
            ("multi", "line1\nline2\\"),
        ];
        let text = write_properties(entries.iter().map(|(k, v)| (*k, *v)));
        let map = parse_properties(&text).unwrap();
        for (k, v) in entries {
            assert_eq!(map[k], v);
        }
    }

    #[test]
    fn test_writer_has_no_header() {
        let text = write_properties([("a", "1")]);
        assert_eq!(text, "a=1\n");
    }
}
