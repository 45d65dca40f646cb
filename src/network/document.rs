//! Workspace documents: the serialized form of a processor network.
//!
//! A document lists processors by identifier and class identifier, with
//! their metadata and property values, followed by the connections and
//! property links between them. Loading rebuilds the network through the
//! context's processor factory.

use crate::config::EvaluationSettings;
use crate::context::ApplicationContext;
use crate::error::{Result, VisError};
use crate::network::error::{NetworkError, NetworkResult};
use crate::network::events::NetworkEvent;
use crate::network::processor::ProcessorMetaData;
use crate::network::processor_network::{PortPath, ProcessorNetwork, PropertyLink};
use crate::network::property::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Newest document version this build reads and the one it writes.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_document_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorDocument {
    pub identifier: String,
    pub class_identifier: String,
    #[serde(default)]
    pub metadata: ProcessorMetaData,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDocument {
    pub outport: PortPath,
    pub inport: PortPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default = "default_document_version")]
    pub version: u32,
    #[serde(default)]
    pub processors: Vec<ProcessorDocument>,
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,
    #[serde(default)]
    pub links: Vec<PropertyLink>,
}

impl Default for NetworkDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            processors: Vec::new(),
            connections: Vec::new(),
            links: Vec::new(),
        }
    }
}

impl NetworkDocument {
    /// Load a workspace document from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisError::Serialization(format!("Failed to read workspace {:?}: {}", path, e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            VisError::Serialization(format!("Failed to parse workspace {:?}: {}", path, e))
        })
    }

    /// Save as pretty-printed JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            VisError::Serialization(format!("Failed to write workspace {:?}: {}", path, e))
        })
    }
}

impl ProcessorNetwork {
    /// Snapshot the network as a document. Processors appear in insertion
    /// order, connections and links in creation order.
    pub fn to_document(&self) -> NetworkDocument {
        let processors = self
            .slots
            .iter()
            .flatten()
            .map(|slot| ProcessorDocument {
                identifier: slot.identifier.clone(),
                class_identifier: slot.processor.info().class_identifier.to_string(),
                metadata: slot.metadata.clone(),
                properties: slot
                    .properties
                    .iter()
                    .map(|p| (p.identifier().to_string(), p.value().clone()))
                    .collect(),
            })
            .collect();
        let connections = self
            .connection_paths()
            .into_iter()
            .map(|(outport, inport)| ConnectionDocument { outport, inport })
            .collect();

        NetworkDocument {
            version: DOCUMENT_VERSION,
            processors,
            connections,
            links: self.links.clone(),
        }
    }

    /// Build a new network from a document. Any error aborts the whole load.
    ///
    /// Read-only property values in the document are ignored; unknown
    /// property names are skipped with a warning.
    pub fn from_document(
        document: &NetworkDocument,
        context: Arc<ApplicationContext>,
        settings: EvaluationSettings,
    ) -> NetworkResult<Self> {
        if document.version > DOCUMENT_VERSION {
            return Err(NetworkError::UnsupportedVersion {
                found: document.version,
                supported: DOCUMENT_VERSION,
            });
        }

        let mut network = ProcessorNetwork::new(context, settings);
        for entry in &document.processors {
            network.add_processor_by_class(entry.identifier.clone(), &entry.class_identifier)?;
            network.set_metadata(&entry.identifier, entry.metadata.clone())?;
            for (name, value) in &entry.properties {
                let read_only = match network.property(&entry.identifier, name) {
                    Ok(property) => property.is_read_only(),
                    Err(_) => {
                        tracing::warn!(
                            "{} has no property {}, value ignored",
                            entry.identifier,
                            name
                        );
                        continue;
                    }
                };
                if !read_only {
                    network.set_property(&entry.identifier, name, value.clone())?;
                }
            }
        }
        for connection in &document.connections {
            network.connect(
                &connection.outport.processor,
                &connection.outport.port,
                &connection.inport.processor,
                &connection.inport.port,
            )?;
        }
        for link in &document.links {
            network.add_link(link.source.clone(), link.destination.clone())?;
        }

        tracing::info!(
            "Loaded network: {} processors, {} connections, {} links",
            network.len(),
            network.connections().len(),
            network.links().len()
        );
        Ok(network)
    }

    /// Replace this network's content with `document`. On error the network
    /// is left unchanged. Subscribers are kept.
    pub fn load_document(&mut self, document: &NetworkDocument) -> NetworkResult<()> {
        let mut loaded =
            ProcessorNetwork::from_document(document, self.context.clone(), self.settings.clone())?;
        loaded.observers = std::mem::take(&mut self.observers);
        loaded.pass = self.pass;
        let previous = std::mem::replace(self, loaded);
        drop(previous);

        self.observers.emit(NetworkEvent::Loaded {
            processors: self.len(),
        });
        Ok(())
    }

    pub fn save_workspace(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_document().save(path)
    }

    pub fn load_workspace(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = NetworkDocument::load(path)?;
        self.load_document(&document)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::processor_network::PropertyPath;
    use crate::network::processors::{BufferScale, BufferSource};

    fn context() -> Arc<ApplicationContext> {
        Arc::new(ApplicationContext::with_default_modules("test"))
    }

    fn sample() -> ProcessorNetwork {
        let mut net = ProcessorNetwork::new(context(), EvaluationSettings::default());
        net.add_processor("source", BufferSource).unwrap();
        net.add_processor("scale", BufferScale::default()).unwrap();
        net.add_processor("scale2", BufferScale::default()).unwrap();
        net.connect("source", "outport", "scale", "inport").unwrap();
        net.add_link(
            PropertyPath::new("scale", "factor"),
            PropertyPath::new("scale2", "factor"),
        )
        .unwrap();
        net.set_property("scale", "factor", PropertyValue::Float(0.5))
            .unwrap();
        net.set_metadata(
            "scale",
            ProcessorMetaData {
                position: [120, -40],
                visible: false,
                selected: true,
            },
        )
        .unwrap();
        net
    }

    #[test]
    fn test_document_round_trip() {
        let net = sample();
        let document = net.to_document();
        let rebuilt =
            ProcessorNetwork::from_document(&document, context(), EvaluationSettings::default())
                .unwrap();
        assert_eq!(rebuilt.to_document(), document);
        assert_eq!(rebuilt.metadata("scale").unwrap().position, [120, -40]);
        assert!(!rebuilt.metadata("scale").unwrap().visible);
    }

    #[test]
    fn test_failed_load_keeps_network() {
        let mut net = sample();
        let mut document = net.to_document();
        document.processors.push(ProcessorDocument {
            identifier: "ghost".into(),
            class_identifier: "org.visnet.Ghost".into(),
            metadata: ProcessorMetaData::default(),
            properties: BTreeMap::new(),
        });
        let before = net.to_document();
        assert!(matches!(
            net.load_document(&document),
            Err(NetworkError::UnknownClass(_))
        ));
        assert_eq!(net.to_document(), before);
    }

    #[test]
    fn test_newer_version_rejected() {
        let document = NetworkDocument {
            version: DOCUMENT_VERSION + 1,
            ..Default::default()
        };
        assert!(matches!(
            ProcessorNetwork::from_document(&document, context(), EvaluationSettings::default()),
            Err(NetworkError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_minimal_json_parses() {
        let json = r#"{
            "processors": [
                { "identifier": "source", "class_identifier": "org.visnet.BufferSource" }
            ]
        }"#;
        let document: NetworkDocument = serde_json::from_str(json).unwrap();
        assert_eq!(document.version, DOCUMENT_VERSION);
        let net =
            ProcessorNetwork::from_document(&document, context(), EvaluationSettings::default())
                .unwrap();
        assert!(net.metadata("source").unwrap().visible);
    }
}
