// ── Signal catalog, model manifest, decoder manifest ──
//
// Wire shapes follow the platform's own document formats so the loaded
// documents can be forwarded to the create calls unchanged. Fields the
// engine does not interpret are carried through in `extra`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::resource::LifecycleStatus;
use crate::error::CoreError;

// ── Catalog nodes ───────────────────────────────────────────────────

/// Common body of every catalog node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBody {
    pub fully_qualified_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One node of the signal catalog tree, tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogNode {
    Branch(NodeBody),
    Sensor(NodeBody),
    Actuator(NodeBody),
    Attribute(NodeBody),
    Struct(NodeBody),
    Property(NodeBody),
}

impl CatalogNode {
    pub fn body(&self) -> &NodeBody {
        match self {
            Self::Branch(b)
            | Self::Sensor(b)
            | Self::Actuator(b)
            | Self::Attribute(b)
            | Self::Struct(b)
            | Self::Property(b) => b,
        }
    }

    pub fn fully_qualified_name(&self) -> &str {
        &self.body().fully_qualified_name
    }

    /// Branches and structs group other nodes; they carry no data.
    pub fn is_signal(&self) -> bool {
        matches!(self, Self::Sensor(_) | Self::Actuator(_) | Self::Attribute(_))
    }
}

/// `true` when `node` is `selected` itself or lives underneath it.
pub fn is_within(selected: &str, node: &str) -> bool {
    node == selected
        || node
            .strip_prefix(selected)
            .is_some_and(|rest| rest.starts_with('.'))
}

// ── Decoder documents ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub interface_id: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDecoder {
    pub fully_qualified_name: String,
    #[serde(rename = "type")]
    pub decoder_type: String,
    pub interface_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Manifests ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SignalCatalog {
    pub name: String,
    pub description: Option<String>,
    pub nodes: Vec<CatalogNode>,
}

impl SignalCatalog {
    pub fn contains(&self, fqn: &str) -> bool {
        self.nodes.iter().any(|n| n.fully_qualified_name() == fqn)
    }

    pub fn fully_qualified_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(CatalogNode::fully_qualified_name)
    }

    fn validate(&self) -> Result<(), CoreError> {
        let mut seen = BTreeSet::new();
        for fqn in self.fully_qualified_names() {
            if !seen.insert(fqn) {
                return Err(CoreError::ValidationFailed {
                    message: format!("signal catalog '{}' declares '{fqn}' twice", self.name),
                });
            }
        }
        Ok(())
    }
}

/// Named subset of catalog nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelManifest {
    pub name: String,
    pub nodes: Vec<String>,
    /// Status the manifest should end up in.
    pub status: LifecycleStatus,
}

impl ModelManifest {
    /// `true` if `signal` is selected by this manifest, directly or through
    /// a selected ancestor.
    pub fn reaches(&self, signal: &str) -> bool {
        self.nodes.iter().any(|n| is_within(n, signal))
    }
}

/// Decode rules for the model's nodes on concrete network interfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderManifest {
    pub name: String,
    pub network_interfaces: Vec<NetworkInterface>,
    pub signal_decoders: Vec<SignalDecoder>,
    pub status: LifecycleStatus,
}

/// The three schema documents, validated as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaManifests {
    pub catalog: SignalCatalog,
    pub model: ModelManifest,
    pub decoder: DecoderManifest,
}

impl SchemaManifests {
    /// Check cross-document references. Runs before any remote call.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.catalog.validate()?;

        if self.model.nodes.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: format!("model manifest '{}' selects no nodes", self.model.name),
            });
        }
        if let Some(missing) = self.model.nodes.iter().find(|n| !self.catalog.contains(n)) {
            return Err(CoreError::ValidationFailed {
                message: format!(
                    "model manifest '{}' selects '{missing}', which is not in signal catalog '{}'",
                    self.model.name, self.catalog.name
                ),
            });
        }

        let interfaces: BTreeSet<&str> = self
            .decoder
            .network_interfaces
            .iter()
            .map(|i| i.interface_id.as_str())
            .collect();

        for decoder in &self.decoder.signal_decoders {
            let fqn = &decoder.fully_qualified_name;
            if !self.catalog.contains(fqn) || !self.model.reaches(fqn) {
                return Err(CoreError::ValidationFailed {
                    message: format!(
                        "decoder manifest '{}' decodes '{fqn}', which model manifest '{}' does not select",
                        self.decoder.name, self.model.name
                    ),
                });
            }
            if !interfaces.contains(decoder.interface_id.as_str()) {
                return Err(CoreError::ValidationFailed {
                    message: format!(
                        "decoder for '{fqn}' uses unknown network interface '{}'",
                        decoder.interface_id
                    ),
                });
            }
        }
        Ok(())
    }
}
