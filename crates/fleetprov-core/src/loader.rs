// ── Schema document loader ──
//
// Reads the node catalog, network-interface list, and signal-decoder list
// from disk. JSON by default; `.yaml` / `.yml` files are parsed as YAML.
// Any failure here aborts the run before a single remote call is made.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{CatalogNode, NetworkInterface, SignalDecoder};

/// Locations of the three schema documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPaths {
    pub nodes: PathBuf,
    pub network_interfaces: PathBuf,
    pub signal_decoders: PathBuf,
}

impl DocumentPaths {
    /// The conventional file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            nodes: dir.join("ros2-nodes.json"),
            network_interfaces: dir.join("network-interfaces.json"),
            signal_decoders: dir.join("ros2-decoders.json"),
        }
    }
}

/// Parsed schema documents, ready for the schema provisioner.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocuments {
    pub nodes: Vec<CatalogNode>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub signal_decoders: Vec<SignalDecoder>,
}

impl SchemaDocuments {
    pub fn load(paths: &DocumentPaths) -> Result<Self, CoreError> {
        let nodes: Vec<CatalogNode> = read_document(&paths.nodes)?;
        let network_interfaces: Vec<NetworkInterface> = read_document(&paths.network_interfaces)?;
        let signal_decoders: Vec<SignalDecoder> = read_document(&paths.signal_decoders)?;

        if nodes.is_empty() {
            return Err(CoreError::InvalidDocument {
                path: paths.nodes.clone(),
                message: "node catalog is empty".into(),
            });
        }

        debug!(
            nodes = nodes.len(),
            interfaces = network_interfaces.len(),
            decoders = signal_decoders.len(),
            "schema documents loaded"
        );

        Ok(Self {
            nodes,
            network_interfaces,
            signal_decoders,
        })
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let invalid = |message: String| CoreError::InvalidDocument {
        path: path.to_path_buf(),
        message,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))
    } else {
        serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn write_docs(dir: &Path, nodes: &str) -> DocumentPaths {
        let paths = DocumentPaths::in_dir(dir);
        fs::write(&paths.nodes, nodes).unwrap();
        fs::write(
            &paths.network_interfaces,
            r#"[{"interfaceId":"10","type":"VEHICLE_MIDDLEWARE","vehicleMiddleware":{"name":"ros2","protocolName":"ROS_2"}}]"#,
        )
        .unwrap();
        fs::write(
            &paths.signal_decoders,
            r#"[{"fullyQualifiedName":"Vehicle.Speed","type":"MESSAGE_SIGNAL","interfaceId":"10"}]"#,
        )
        .unwrap();
        paths
    }

    #[test]
    fn loads_json_documents() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(
            dir.path(),
            r#"[{"branch":{"fullyQualifiedName":"Vehicle"}},{"sensor":{"fullyQualifiedName":"Vehicle.Speed","dataType":"DOUBLE"}}]"#,
        );

        let docs = SchemaDocuments::load(&paths).unwrap();

        assert_eq!(docs.nodes.len(), 2);
        assert_eq!(docs.network_interfaces[0].interface_id, "10");
        assert_eq!(docs.signal_decoders[0].fully_qualified_name, "Vehicle.Speed");
    }

    #[test]
    fn loads_yaml_when_extension_says_so() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_docs(dir.path(), "[]");
        paths.nodes = dir.path().join("nodes.yaml");
        fs::write(
            &paths.nodes,
            "- branch:\n    fullyQualifiedName: Vehicle\n- sensor:\n    fullyQualifiedName: Vehicle.Speed\n",
        )
        .unwrap();

        let docs = SchemaDocuments::load(&paths).unwrap();
        assert_eq!(docs.nodes[1].fully_qualified_name(), "Vehicle.Speed");
    }

    #[test]
    fn parse_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(dir.path(), "{ not json");

        let err = SchemaDocuments::load(&paths).unwrap_err();
        match err {
            CoreError::InvalidDocument { path, .. } => assert_eq!(path, paths.nodes),
            other => panic!("expected InvalidDocument, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_invalid_document() {
        let paths = DocumentPaths::in_dir(Path::new("/definitely/not/here"));
        assert!(matches!(
            SchemaDocuments::load(&paths),
            Err(CoreError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_docs(dir.path(), "[]");
        assert!(SchemaDocuments::load(&paths).is_err());
    }
}
