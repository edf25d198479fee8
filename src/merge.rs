//! Per-file merging of profile contributions.
//!
//! Every contributed file is classified by extension. Structured files
//! (properties, YAML, JSON) are parsed into a [`ConfigTree`] and overlaid key
//! by key; anything else is opaque and the last contributor replaces earlier
//! versions outright. A YAML file holding several documents has no single
//! tree to overlay, so it is handled like an opaque file.

use indexmap::IndexMap;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

use crate::error::{ProfileError, Result};
use crate::profile::{Profile, ProfileFile, ProfileLayout};
use crate::tree::properties::{parse_properties, write_properties};
use crate::tree::{self, ConfigTree};

/// How a file merges across profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.properties` and `.cfg` flat key/value files.
    Properties,
    Yaml,
    Json,
    /// Copied verbatim; the most specific contributor wins.
    Opaque,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Properties => write!(f, "properties"),
            FileKind::Yaml => write!(f, "yaml"),
            FileKind::Json => write!(f, "json"),
            FileKind::Opaque => write!(f, "opaque"),
        }
    }
}

impl FileKind {
    /// Classify a `/`-separated file path by its extension.
    pub fn classify(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path);
        let Some((stem, ext)) = name.rsplit_once('.') else {
            return FileKind::Opaque;
        };
        if stem.is_empty() {
            return FileKind::Opaque;
        }
        match ext.to_ascii_lowercase().as_str() {
            "properties" | "cfg" => FileKind::Properties,
            "yaml" | "yml" => FileKind::Yaml,
            "json" => FileKind::Json,
            _ => FileKind::Opaque,
        }
    }

    /// Merge two versions of one file. Trees overlay key by key; any other
    /// combination is replaced by the overlay.
    pub fn merge(self, base: MergedContent, overlay: MergedContent) -> MergedContent {
        match (self, base, overlay) {
            (FileKind::Opaque, _, overlay) => overlay,
            (_, MergedContent::Tree(base), MergedContent::Tree(overlay)) => {
                MergedContent::Tree(tree::merge(base, overlay))
            }
            (_, _, overlay) => overlay,
        }
    }
}

/// Decode file bytes as text: UTF-8 when valid, Latin-1 otherwise.
///
/// A leading byte-order mark is dropped.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Parse a structured file's contents into a tree; `origin` names the
/// profile or container it came from in errors.
///
/// `strip_key` removes one flat key from a properties file before the tree
/// is built; it is how the parents declaration is kept out of the output.
pub(crate) fn decode_document(
    kind: FileKind,
    origin: &str,
    file: &ProfileFile,
    strip_key: Option<&str>,
) -> Result<ConfigTree> {
    match decode_content(kind, origin, file, strip_key)? {
        MergedContent::Tree(tree) => Ok(tree),
        MergedContent::Bytes(_) => Err(ProfileError::document(
            origin,
            &file.path,
            "expected a single structured document",
        )),
    }
}

/// Decode one contribution. Opaque files and YAML streams of several
/// documents stay as bytes.
fn decode_content(
    kind: FileKind,
    origin: &str,
    file: &ProfileFile,
    strip_key: Option<&str>,
) -> Result<MergedContent> {
    let text = decode_text(&file.contents);
    let tree = match kind {
        FileKind::Opaque => return Ok(MergedContent::Bytes(file.contents.clone())),
        FileKind::Properties => {
            let mut entries = parse_properties(&text)
                .map_err(|err| ProfileError::document(origin, &file.path, err))?;
            if let Some(key) = strip_key {
                entries.shift_remove(key);
            }
            tree::parse(entries).map_err(|source| ProfileError::StructureConflict {
                profile: origin.to_string(),
                file: file.path.clone(),
                source,
            })?
        }
        FileKind::Yaml => {
            let mut documents = yaml_documents(&text)
                .map_err(|err| ProfileError::document(origin, &file.path, err))?;
            if documents.len() > 1 {
                debug!(
                    profile = %origin,
                    file = %file.path,
                    documents = documents.len(),
                    "Keeping YAML stream verbatim"
                );
                return Ok(MergedContent::Bytes(file.contents.clone()));
            }
            match documents.pop().map(from_yaml) {
                None | Some(ConfigTree::Null) => ConfigTree::default(),
                Some(tree) => tree,
            }
        }
        FileKind::Json => {
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|err| ProfileError::document(origin, &file.path, err))?;
            ConfigTree::from_json(value)
        }
    };
    Ok(MergedContent::Tree(tree))
}

fn yaml_documents(text: &str) -> std::result::Result<Vec<serde_yaml::Value>, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::Deserializer::from_str(text)
        .map(serde_yaml::Value::deserialize)
        .collect()
}

fn from_yaml(value: serde_yaml::Value) -> ConfigTree {
    use serde_yaml::Value;
    match value {
        Value::Null => ConfigTree::Null,
        Value::Bool(b) => ConfigTree::Literal(b.to_string()),
        Value::Number(n) => ConfigTree::Literal(n.to_string()),
        Value::String(s) => ConfigTree::Scalar(s),
        Value::Sequence(items) => ConfigTree::Array(items.into_iter().map(from_yaml).collect()),
        Value::Mapping(map) => ConfigTree::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), from_yaml(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match from_yaml(key) {
        ConfigTree::Scalar(s) | ConfigTree::Literal(s) => s,
        ConfigTree::Null => "null".to_string(),
        other => serde_json::to_string(&other).unwrap_or_default(),
    }
}

/// Accumulated content of one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedContent {
    Tree(ConfigTree),
    Bytes(Vec<u8>),
}

/// One output file and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    /// Path relative to the target directory, `/`-separated.
    pub path: String,
    pub kind: FileKind,
    pub content: MergedContent,
    /// Profiles that contributed, in merge order. For opaque files the last
    /// one is the version kept.
    pub contributors: Vec<String>,
}

impl MergedFile {
    pub fn tree(&self) -> Option<&ConfigTree> {
        match &self.content {
            MergedContent::Tree(tree) => Some(tree),
            MergedContent::Bytes(_) => None,
        }
    }

    /// Serialize the merged content in the file's native format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let tree = match &self.content {
            MergedContent::Bytes(bytes) => return Ok(bytes.clone()),
            MergedContent::Tree(tree) => tree,
        };
        let owner = self.contributors.last().map(String::as_str).unwrap_or("");

        match self.kind {
            FileKind::Properties => {
                let flat = tree::flatten(tree);
                Ok(write_properties(flat.iter().map(|(k, v)| (k.as_str(), v.as_str()))).into_bytes())
            }
            FileKind::Yaml => serde_yaml::to_string(tree)
                .map(String::into_bytes)
                .map_err(|err| ProfileError::document(owner, &self.path, err)),
            FileKind::Json => {
                let mut text = serde_json::to_string_pretty(tree)
                    .map_err(|err| ProfileError::document(owner, &self.path, err))?;
                text.push('\n');
                Ok(text.into_bytes())
            }
            // trees are only built for structured kinds
            FileKind::Opaque => Ok(Vec::new()),
        }
    }
}

/// Accumulates every file of a merge sequence, one profile at a time.
///
/// Profiles must be added least specific first; later additions win.
#[derive(Debug, Clone)]
pub struct FileMerger {
    layout: ProfileLayout,
    files: IndexMap<String, MergedFile>,
}

impl FileMerger {
    pub fn new(layout: ProfileLayout) -> Self {
        Self {
            layout,
            files: IndexMap::new(),
        }
    }

    /// Merge one contributed file into the accumulator.
    pub fn add(&mut self, profile: &str, file: &ProfileFile) -> Result<()> {
        let kind = FileKind::classify(&file.path);
        let is_declarations = file.path == self.layout.declarations_file;
        debug!(profile = %profile, file = %file.path, kind = %kind, "Merging file");

        let strip = is_declarations.then_some(self.layout.parents_key.as_str());
        let content = decode_content(kind, profile, file, strip)?;

        match self.files.get_mut(&file.path) {
            Some(existing) => {
                let base = std::mem::replace(&mut existing.content, MergedContent::Bytes(Vec::new()));
                existing.content = kind.merge(base, content);
                existing.contributors.push(profile.to_string());
            }
            None => {
                self.files.insert(
                    file.path.clone(),
                    MergedFile {
                        path: file.path.clone(),
                        kind,
                        content,
                        contributors: vec![profile.to_string()],
                    },
                );
            }
        }
        Ok(())
    }

    /// Merge every file of a profile.
    pub fn add_profile(&mut self, profile: &Profile) -> Result<()> {
        for file in &profile.files {
            self.add(&profile.name, file)?;
        }
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&MergedFile> {
        self.files.get(path)
    }

    /// Final set of output files, sorted by path.
    ///
    /// The declarations file stays in the output without its parents key, so
    /// generators can read the other declarations from the merged copy. It is
    /// dropped when nothing else remains.
    pub fn finish(self) -> IndexMap<String, MergedFile> {
        let declarations = self.layout.declarations_file;
        let mut files: IndexMap<String, MergedFile> = self
            .files
            .into_iter()
            .filter(|(path, file)| {
                *path != declarations || file.tree().is_some_and(|tree| !tree.is_empty())
            })
            .collect();
        files.sort_keys();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::profile::DEFAULT_DECLARATIONS_FILE;

    fn merger() -> FileMerger {
        FileMerger::new(ProfileLayout::default())
    }

    fn flat_of(file: &MergedFile) -> IndexMap<String, String> {
        tree::flatten(file.tree().unwrap())
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(FileKind::classify("a.properties"), FileKind::Properties);
        assert_eq!(FileKind::classify("etc/org.ops4j.pax.url.mvn.cfg"), FileKind::Properties);
        assert_eq!(FileKind::classify("app.YML"), FileKind::Yaml);
        assert_eq!(FileKind::classify("svc.json"), FileKind::Json);
        assert_eq!(FileKind::classify("readme.md"), FileKind::Opaque);
        assert_eq!(FileKind::classify("Makefile"), FileKind::Opaque);
        assert_eq!(FileKind::classify("conf.d/.json"), FileKind::Opaque);
    }

    #[test]
    fn test_decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text(b"caf\xe9"), "café");
        assert_eq!(decode_text("\u{feff}a=1".as_bytes()), "a=1");
    }

    #[test]
    fn test_properties_overlay_keeps_untouched_keys() {
        let mut m = merger();
        m.add("parent", &ProfileFile::new("app.properties", "k=1\nj=5\n")).unwrap();
        m.add("child", &ProfileFile::new("app.properties", "k=2\n")).unwrap();

        let files = m.finish();
        let app = &files["app.properties"];
        assert_eq!(flat_of(app)["k"], "2");
        assert_eq!(flat_of(app)["j"], "5");
        assert_eq!(app.contributors, vec!["parent", "child"]);
    }

    #[test]
    fn test_opaque_file_is_replaced() {
        let mut m = merger();
        m.add("parent", &ProfileFile::new("readme.md", "X")).unwrap();
        m.add("child", &ProfileFile::new("readme.md", "Y")).unwrap();

        let files = m.finish();
        assert_eq!(files["readme.md"].content, MergedContent::Bytes(b"Y".to_vec()));
        assert_eq!(files["readme.md"].encode().unwrap(), b"Y");
    }

    #[test]
    fn test_declarations_parents_key_stripped() {
        let mut m = merger();
        m.add(
            "child",
            &ProfileFile::new(
                DEFAULT_DECLARATIONS_FILE,
                "attribute.parents=base\nfeature.camel=camel\n",
            ),
        )
        .unwrap();

        let files = m.finish();
        let decl = &files[DEFAULT_DECLARATIONS_FILE];
        assert_eq!(flat_of(decl).into_iter().collect::<Vec<_>>(), vec![(
            "feature.camel".to_string(),
            "camel".to_string()
        )]);
    }

    #[test]
    fn test_declarations_with_only_parents_is_omitted() {
        let mut m = merger();
        m.add("a", &ProfileFile::new(DEFAULT_DECLARATIONS_FILE, "attribute.parents=x y\n"))
            .unwrap();
        assert!(m.finish().is_empty());
    }

    #[test]
    fn test_structure_conflict_names_profile_and_file() {
        let mut m = merger();
        let err = m
            .add("p", &ProfileFile::new("bad.properties", "a.b=1\na.b[0]=2\n"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StructureConflict);
        let message = err.to_string();
        assert!(message.contains("bad.properties"));
        assert!(message.contains("profile p"));
        assert!(message.contains("a.b[0]"));
    }

    #[test]
    fn test_conflict_across_profiles_resolves_to_overlay() {
        let mut m = merger();
        m.add("parent", &ProfileFile::new("x.properties", "v=42\n")).unwrap();
        m.add("child", &ProfileFile::new("x.properties", "v.nested=true\n")).unwrap();
        let files = m.finish();
        assert_eq!(flat_of(&files["x.properties"])["v.nested"], "true");
    }

    #[test]
    fn test_yaml_documents_merge_deeply() {
        let mut m = merger();
        m.add(
            "parent",
            &ProfileFile::new("app.yml", "server:\n  port: 8080\n  host: localhost\nlist: [a, b]\n"),
        )
        .unwrap();
        m.add("child", &ProfileFile::new("app.yml", "server:\n  port: 9000\nlist: [~, B, c]\n"))
            .unwrap();

        let files = m.finish();
        let tree = files["app.yml"].tree().unwrap();
        assert_eq!(tree.at("server.port").and_then(ConfigTree::as_str), Some("9000"));
        assert_eq!(tree.at("server.host").and_then(ConfigTree::as_str), Some("localhost"));
        let list: Vec<_> = tree
            .at("list")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(list, vec!["a", "B", "c"]);
    }

    #[test]
    fn test_empty_yaml_is_empty_object() {
        let mut m = merger();
        m.add("p", &ProfileFile::new("empty.yaml", "")).unwrap();
        let files = m.finish();
        assert_eq!(files["empty.yaml"].tree(), Some(&ConfigTree::default()));
    }

    #[test]
    fn test_yaml_non_string_keys_are_stringified() {
        let mut m = merger();
        m.add("p", &ProfileFile::new("codes.yaml", "200: ok\ntrue: yes\n")).unwrap();
        let files = m.finish();
        let tree = files["codes.yaml"].tree().unwrap();
        assert_eq!(tree.get("200").and_then(ConfigTree::as_str), Some("ok"));
        assert_eq!(tree.get("true").and_then(ConfigTree::as_str), Some("yes"));
    }

    #[test]
    fn test_invalid_json_is_document_error() {
        let mut m = merger();
        let err = m.add("p", &ProfileFile::new("svc.json", "{ nope")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDocument);
    }

    #[test]
    fn test_json_encodes_pretty_with_newline() {
        let mut m = merger();
        m.add("p", &ProfileFile::new("svc.json", r#"{"name":"svc","replicas":2}"#))
            .unwrap();
        let files = m.finish();
        let text = String::from_utf8(files["svc.json"].encode().unwrap()).unwrap();
        assert_eq!(text, "{\n  \"name\": \"svc\",\n  \"replicas\": 2\n}\n");
    }

    #[test]
    fn test_single_contributor_documents_keep_value_types() {
        let mut m = merger();
        m.add("p", &ProfileFile::new("deployment.yml", "spec:\n  replicas: 2\n  paused: false\n  name: '80'\n"))
            .unwrap();
        m.add("p", &ProfileFile::new("svc.json", r#"{"port": 8080, "tls": true, "ratio": 0.5}"#))
            .unwrap();
        let files = m.finish();

        let yaml = String::from_utf8(files["deployment.yml"].encode().unwrap()).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(doc["spec"]["replicas"].as_u64(), Some(2));
        assert_eq!(doc["spec"]["paused"].as_bool(), Some(false));
        assert_eq!(doc["spec"]["name"].as_str(), Some("80"));

        let json: serde_json::Value =
            serde_json::from_slice(&files["svc.json"].encode().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"port": 8080, "tls": true, "ratio": 0.5}));
    }

    #[test]
    fn test_merged_yaml_keeps_overlay_types() {
        let mut m = merger();
        m.add("parent", &ProfileFile::new("app.yml", "replicas: 1
debug: false
")).unwrap();
        m.add("child", &ProfileFile::new("app.yml", "replicas: 3
")).unwrap();
        let files = m.finish();
        let yaml = String::from_utf8(files["app.yml"].encode().unwrap()).unwrap();
        assert_eq!(yaml, "replicas: 3\ndebug: false\n");
    }

    #[test]
    fn test_yaml_stream_is_kept_verbatim() {
        let stream = "kind: Service\n---\nkind: Deployment\n";
        let mut m = merger();
        m.add("base", &ProfileFile::new("k8s.yml", "kind: Base\n")).unwrap();
        m.add("app", &ProfileFile::new("k8s.yml", stream)).unwrap();
        let files = m.finish();

        let k8s = &files["k8s.yml"];
        assert_eq!(k8s.kind, FileKind::Yaml);
        assert!(k8s.tree().is_none());
        assert_eq!(k8s.encode().unwrap(), stream.as_bytes());
        assert_eq!(k8s.contributors, vec!["base", "app"]);
    }

    #[test]
    fn test_single_document_overrides_yaml_stream() {
        let mut m = merger();
        m.add("base", &ProfileFile::new("k8s.yml", "kind: A\n---\nkind: B\n")).unwrap();
        m.add("app", &ProfileFile::new("k8s.yml", "---\nkind: C\n")).unwrap();
        let files = m.finish();
        let tree = files["k8s.yml"].tree().unwrap();
        assert_eq!(tree.get("kind").and_then(ConfigTree::as_str), Some("C"));
    }

    #[test]
    fn test_properties_encode_in_tree_order() {
        let mut m = merger();
        m.add("p", &ProfileFile::new("a.cfg", "z=1\na.b=2\na.c=3\n")).unwrap();
        m.add("q", &ProfileFile::new("a.cfg", "m=4\n")).unwrap();
        let files = m.finish();
        let text = String::from_utf8(files["a.cfg"].encode().unwrap()).unwrap();
        assert_eq!(text, "z=1\na.b=2\na.c=3\nm=4\n");
    }

    #[test]
    fn test_finish_sorts_paths() {
        let mut m = merger();
        m.add("p", &ProfileFile::new("z.txt", "z")).unwrap();
        m.add("p", &ProfileFile::new("a.txt", "a")).unwrap();
        let keys: Vec<_> = m.finish().into_keys().collect();
        assert_eq!(keys, vec!["a.txt", "z.txt"]);
    }
}
