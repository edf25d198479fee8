//! Output formatting utilities for markdown and JSON.

use clap::ValueEnum;
use serde_json::{Value, json};

use crate::materialize::{MaterializedConfig, MergedProfiles};
use crate::merge::{MergedContent, MergedFile};
use crate::order::MergeSequence;
use crate::tree;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    #[value(alias = "md")]
    Markdown,
}

/// Format a merge sequence as a numbered list, least specific first.
pub fn format_sequence_markdown(sequence: &MergeSequence) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Merge order ({})\n\n", sequence.len()));
    for (i, name) in sequence.iter().enumerate() {
        md.push_str(&format!("{}. `{}`\n", i + 1, name));
    }

    md
}

/// Format profile names as a bullet list.
pub fn format_profiles_markdown(names: &[String]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Profiles ({})\n\n", names.len()));
    for name in names {
        md.push_str(&format!("- `{}`\n", name));
    }

    md
}

/// One line per output file: kind and contributing profiles.
fn format_file_short(file: &MergedFile) -> String {
    format!(
        "- `{}` ({}) from {}\n",
        file.path,
        file.kind,
        file.contributors.join(", ")
    )
}

/// Summarize a materialized directory.
pub fn format_materialized_markdown(config: &MaterializedConfig) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Materialized: {}\n", config.target().display()));
    md.push_str(&format!(
        "- **profiles**: {}\n",
        config.sequence().as_slice().join(" -> ")
    ));

    let files: Vec<&MergedFile> = config.files().collect();
    md.push_str(&format!("\n## Files ({})\n\n", files.len()));
    for file in files {
        md.push_str(&format_file_short(file));
    }

    md
}

/// Format one merged file. Structured files are shown as flat properties;
/// opaque files only by size.
pub fn format_file_markdown(file: &MergedFile) -> String {
    let mut md = String::new();

    md.push_str(&format!("## {}\n", file.path));
    md.push_str(&format!("- **kind**: {}\n", file.kind));
    md.push_str(&format!("- **from**: {}\n", file.contributors.join(", ")));

    match &file.content {
        MergedContent::Tree(tree) => {
            let flat = tree::flatten(tree);
            if !flat.is_empty() {
                md.push_str("\n```properties\n");
                for (key, value) in &flat {
                    md.push_str(&format!("{}={}\n", key, value));
                }
                md.push_str("```\n");
            }
        }
        MergedContent::Bytes(bytes) => {
            md.push_str(&format!("- **size**: {} bytes\n", bytes.len()));
        }
    }

    md
}

/// Format a merged result, optionally limited to one file.
pub fn format_merged_markdown(merged: &MergedProfiles, only: Option<&str>) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Profiles: {}\n\n",
        merged.sequence.as_slice().join(" -> ")
    ));
    for file in merged.files.values() {
        if only.is_some_and(|path| path != file.path) {
            continue;
        }
        md.push_str(&format_file_markdown(file));
        md.push('\n');
    }

    md
}

/// Summarize reified containers.
pub fn format_containers_markdown(containers: &[(String, MaterializedConfig)]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Containers ({})\n\n", containers.len()));
    for (name, config) in containers {
        md.push_str(&format!("## {}\n", name));
        md.push_str(&format!("- **target**: {}\n", config.target().display()));
        md.push_str(&format!(
            "- **profiles**: {}\n",
            config.sequence().as_slice().join(" -> ")
        ));
        md.push_str(&format!("- **files**: {}\n\n", config.files().count()));
    }

    md
}

/// JSON view of one merged file.
pub fn file_json(file: &MergedFile) -> Value {
    let content = match &file.content {
        MergedContent::Tree(tree) => tree.to_typed_json(),
        MergedContent::Bytes(bytes) => json!({ "size": bytes.len() }),
    };
    json!({
        "path": file.path,
        "kind": file.kind.to_string(),
        "contributors": file.contributors,
        "content": content,
    })
}

/// JSON view of a materialized directory.
pub fn materialized_json(config: &MaterializedConfig) -> Value {
    json!({
        "target": config.target().display().to_string(),
        "sequence": config.sequence(),
        "files": config.files().map(file_json).collect::<Vec<_>>(),
    })
}

/// JSON view of a merged result, optionally limited to one file.
pub fn merged_json(merged: &MergedProfiles, only: Option<&str>) -> Value {
    json!({
        "sequence": merged.sequence,
        "files": merged
            .files
            .values()
            .filter(|file| only.is_none_or(|path| path == file.path))
            .map(file_json)
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::Materializer;
    use crate::profile::{MemorySource, Profile};

    fn merged() -> MergedProfiles {
        let source: MemorySource = [
            Profile::new("base")
                .with_file("app.properties", "a=1\nb=1\n")
                .with_file("README.md", "base"),
            Profile::new("child")
                .with_parents(["base"])
                .with_file("app.properties", "b=2\n"),
        ]
        .into_iter()
        .collect();
        Materializer::new(source).compute(&["child"]).unwrap()
    }

    #[test]
    fn test_sequence_markdown() {
        let sequence = MergeSequence::new(vec!["base".into(), "child".into()]);
        let md = format_sequence_markdown(&sequence);
        assert!(md.starts_with("# Merge order (2)"));
        assert!(md.contains("1. `base`\n2. `child`\n"));
    }

    #[test]
    fn test_profiles_markdown() {
        let md = format_profiles_markdown(&["a".to_string(), "a-b".to_string()]);
        assert!(md.contains("# Profiles (2)"));
        assert!(md.contains("- `a-b`"));
    }

    #[test]
    fn test_merged_markdown_shows_flat_properties() {
        let md = format_merged_markdown(&merged(), None);
        assert!(md.contains("# Profiles: base -> child"));
        assert!(md.contains("a=1\nb=2\n"));
        assert!(md.contains("- **from**: base, child"));
        assert!(md.contains("- **size**: 4 bytes"));
    }

    #[test]
    fn test_merged_markdown_single_file() {
        let md = format_merged_markdown(&merged(), Some("README.md"));
        assert!(md.contains("## README.md"));
        assert!(!md.contains("app.properties"));
    }

    #[test]
    fn test_merged_json() {
        let value = merged_json(&merged(), Some("app.properties"));
        assert_eq!(value["sequence"], json!(["base", "child"]));
        let files = value["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["kind"], "properties");
        assert_eq!(files[0]["content"]["b"], "2");
    }

    #[test]
    fn test_output_format_values() {
        assert_eq!(OutputFormat::default(), OutputFormat::Markdown);
        assert_eq!(
            <OutputFormat as ValueEnum>::from_str("md", true),
            Ok(OutputFormat::Markdown)
        );
        assert_eq!(
            <OutputFormat as ValueEnum>::from_str("json", true),
            Ok(OutputFormat::Json)
        );
    }
}
