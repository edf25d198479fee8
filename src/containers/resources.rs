//! `fabric8-resources` containers: merged YAML/JSON resources with inlined data.

use std::path::Path;
use tracing::debug;

use super::ProjectReifier;
use crate::error::{ProfileError, Result};
use crate::materialize::MaterializedConfig;
use crate::merge::{FileKind, MergedContent, MergedFile, decode_text};
use crate::tree::properties::write_properties;
use crate::tree::{self, ConfigTree};

pub const RESOURCES_CONTAINER_TYPE: &str = "fabric8-resources";

/// Where resource documents land inside the container project.
pub const RESOURCES_PATH: &str = "src/main/resources/fabric8";

/// Merged container properties written for downstream build steps.
pub const CONTAINER_PROPERTIES: &str = "container.properties";

/// Copies resource documents into a container project.
///
/// Every `data` mapping in a copied document has its values replaced by the
/// contents of the materialized file named by the key, when such a file
/// exists. Documents with nothing to inline, and YAML streams, are copied as
/// materialized.
#[derive(Debug, Clone, Default)]
pub struct ResourcesReifier {
    defaults: ConfigTree,
}

impl ResourcesReifier {
    pub fn new(defaults: ConfigTree) -> Self {
        Self { defaults }
    }

    /// Factory for [`super::ReifierRegistry`].
    pub fn create(defaults: ConfigTree) -> Box<dyn ProjectReifier> {
        Box::new(Self::new(defaults))
    }

    fn write(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| ProfileError::io("create directory", parent, err))?;
        }
        std::fs::write(path, bytes).map_err(|err| ProfileError::io("write", path, err))
    }
}

impl ProjectReifier for ResourcesReifier {
    fn reify(&self, target: &Path, config: &ConfigTree, materialized: &MaterializedConfig) -> Result<()> {
        let properties = tree::merge(self.defaults.clone(), config.clone());
        let flat = tree::flatten(&properties);
        Self::write(
            &target.join(CONTAINER_PROPERTIES),
            write_properties(flat.iter().map(|(k, v)| (k.as_str(), v.as_str()))).as_bytes(),
        )?;

        let resources = target.join(RESOURCES_PATH);
        for file in materialized.files() {
            if !matches!(file.kind, FileKind::Yaml | FileKind::Json) {
                continue;
            }
            let bytes = match file.tree() {
                Some(document) => {
                    let mut document = document.clone();
                    let inlined = inline_data(&mut document, materialized)?;
                    debug!(resource = %file.path, inlined, "Copying resource");
                    if inlined == 0 {
                        file.encode()?
                    } else {
                        MergedFile {
                            path: file.path.clone(),
                            kind: file.kind,
                            content: MergedContent::Tree(document),
                            contributors: file.contributors.clone(),
                        }
                        .encode()?
                    }
                }
                None => {
                    debug!(resource = %file.path, "Copying resource stream");
                    file.encode()?
                }
            };
            Self::write(&resources.join(&file.path), &bytes)?;
        }
        Ok(())
    }
}

/// Replace values of every `data` mapping whose key names a materialized
/// file with that file's text. Returns how many values were replaced.
fn inline_data(node: &mut ConfigTree, materialized: &MaterializedConfig) -> Result<usize> {
    let mut count = 0;
    match node {
        ConfigTree::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "data"
                    && let ConfigTree::Object(entries) = child
                {
                    for (name, value) in entries.iter_mut() {
                        if let Some(source) = materialized.file(name) {
                            *value = ConfigTree::Scalar(file_text(source)?);
                            count += 1;
                        }
                    }
                    continue;
                }
                count += inline_data(child, materialized)?;
            }
        }
        ConfigTree::Array(items) => {
            for item in items {
                count += inline_data(item, materialized)?;
            }
        }
        ConfigTree::Null | ConfigTree::Scalar(_) | ConfigTree::Literal(_) => {}
    }
    Ok(count)
}

/// File contents as lines joined by `\n`, without a trailing newline.
fn file_text(file: &MergedFile) -> Result<String> {
    let bytes = file.encode()?;
    Ok(decode_text(&bytes).lines().collect::<Vec<_>>().join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::Materializer;
    use crate::profile::{MemorySource, Profile};
    use tempfile::TempDir;

    fn materialize(temp: &TempDir) -> MaterializedConfig {
        let source: MemorySource = [Profile::new("app")
            .with_file("application.properties", "server.port=8080\n")
            .with_file(
                "configmap.yml",
                "kind: ConfigMap\ndata:\n  application.properties: placeholder\n  other: keep\n",
            )
            .with_file("notes.txt", "ignored")]
        .into_iter()
        .collect();
        Materializer::new(source)
            .materialize(temp.path().join(".profiles"), &["app"])
            .unwrap()
    }

    #[test]
    fn test_data_entries_inlined_from_materialized_files() {
        let temp = TempDir::new().unwrap();
        let materialized = materialize(&temp);
        let target = temp.path();

        ResourcesReifier::default()
            .reify(target, &ConfigTree::default(), &materialized)
            .unwrap();

        let written = std::fs::read_to_string(target.join(RESOURCES_PATH).join("configmap.yml")).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
        assert_eq!(doc["data"]["application.properties"].as_str(), Some("server.port=8080"));
        assert_eq!(doc["data"]["other"].as_str(), Some("keep"));
        assert!(!target.join(RESOURCES_PATH).join("notes.txt").exists());
        assert!(!target.join(RESOURCES_PATH).join("application.properties").exists());
    }

    #[test]
    fn test_resources_without_data_copied_as_materialized() {
        let temp = TempDir::new().unwrap();
        let stream = "kind: Service\n---\nkind: Deployment\n";
        let source: MemorySource = [Profile::new("app")
            .with_file("deployment.yml", "spec:\n  replicas: 2\n  paused: false\n")
            .with_file("svc.json", r#"{"port": 8080, "tls": true}"#)
            .with_file("k8s.yml", stream)]
        .into_iter()
        .collect();
        let materialized = Materializer::new(source)
            .materialize(temp.path().join(".profiles"), &["app"])
            .unwrap();
        let target = temp.path().join("project");

        ResourcesReifier::default()
            .reify(&target, &ConfigTree::default(), &materialized)
            .unwrap();

        let resources = target.join(RESOURCES_PATH);
        for name in ["deployment.yml", "svc.json", "k8s.yml"] {
            assert_eq!(
                std::fs::read(resources.join(name)).unwrap(),
                std::fs::read(temp.path().join(".profiles").join(name)).unwrap(),
                "{name} differs from the materialized copy"
            );
        }
        let doc: serde_yaml::Value =
            serde_yaml::from_slice(&std::fs::read(resources.join("deployment.yml")).unwrap()).unwrap();
        assert_eq!(doc["spec"]["replicas"].as_u64(), Some(2));
        assert_eq!(doc["spec"]["paused"].as_bool(), Some(false));
        assert_eq!(std::fs::read_to_string(resources.join("k8s.yml")).unwrap(), stream);
    }

    #[test]
    fn test_container_properties_merge_defaults_beneath_config() {
        let temp = TempDir::new().unwrap();
        let materialized = materialize(&temp);
        let defaults = tree::parse([("maven.groupId", "io.example"), ("maven.version", "1.0")]).unwrap();
        let config = tree::parse([("maven.version", "2.0")]).unwrap();

        ResourcesReifier::new(defaults)
            .reify(temp.path(), &config, &materialized)
            .unwrap();

        let text = std::fs::read_to_string(temp.path().join(CONTAINER_PROPERTIES)).unwrap();
        assert_eq!(text, "maven.groupId=io.example\nmaven.version=2.0\n");
    }

    #[test]
    fn test_nested_data_mappings_found() {
        let temp = TempDir::new().unwrap();
        let materialized = materialize(&temp);
        // the data key contains a dot, so it cannot come from a flat key
        let mut doc = ConfigTree::from_json(serde_json::json!({
            "items": [{"data": {"application.properties": "x"}}]
        }));
        assert_eq!(inline_data(&mut doc, &materialized).unwrap(), 1);
        assert_eq!(
            doc.at("items[0].data").unwrap().get("application.properties").and_then(ConfigTree::as_str),
            Some("server.port=8080")
        );
    }
}
