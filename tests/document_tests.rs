//! Integration tests for workspace documents

mod common;

use visnet::config::WORKSPACE_EXTENSION;
use visnet::network::processors::{BufferScale, BufferSource, BufferStatistics};
use visnet::network::{
    NetworkDocument, NetworkEvent, PropertyPath, PropertyValue, DOCUMENT_VERSION,
};
use visnet::{ProcessorNetwork, VisError};

fn workspace() -> ProcessorNetwork {
    let mut net = common::test_network();
    net.add_processor("source", BufferSource).unwrap();
    net.add_processor("scale", BufferScale::default()).unwrap();
    net.add_processor("stats", BufferStatistics::default())
        .unwrap();
    net.connect("source", "outport", "scale", "inport").unwrap();
    net.connect("scale", "outport", "stats", "inport").unwrap();
    net.set_property(
        "source",
        "values",
        PropertyValue::FloatList(vec![0.5, 1.5, -2.0]),
    )
    .unwrap();
    net.set_property("scale", "factor", PropertyValue::Float(4.0))
        .unwrap();
    net
}

#[test]
fn test_workspace_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join("projects")
        .join(format!("pipeline.{WORKSPACE_EXTENSION}"));

    let mut original = workspace();
    original.save_workspace(&path).unwrap();
    assert!(path.exists());

    let mut restored = common::test_network();
    restored.load_workspace(&path).unwrap();
    assert_eq!(restored.to_document(), original.to_document());
    assert_eq!(restored.processor_identifiers(), vec!["source", "scale", "stats"]);

    original.evaluate();
    let report = restored.evaluate();
    assert!(report.is_success());
    assert_eq!(
        common::outport_values(&restored, "scale", "outport"),
        common::outport_values(&original, "scale", "outport")
    );
    assert_eq!(
        common::outport_values(&restored, "scale", "outport"),
        vec![2.0, 6.0, -8.0]
    );
}

#[test]
fn test_links_survive_round_trip() {
    let mut net = workspace();
    net.add_processor("scale2", BufferScale::default()).unwrap();
    net.add_link(
        PropertyPath::new("scale", "factor"),
        PropertyPath::new("scale2", "factor"),
    )
    .unwrap();

    let json = serde_json::to_string(&net.to_document()).unwrap();
    let document: NetworkDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(document.version, DOCUMENT_VERSION);

    let mut restored =
        ProcessorNetwork::from_document(&document, common::test_context(), Default::default())
            .unwrap();
    assert_eq!(restored.links().len(), 1);
    restored
        .set_property("scale", "factor", PropertyValue::Float(0.25))
        .unwrap();
    assert_eq!(
        restored
            .property("scale2", "factor")
            .unwrap()
            .value()
            .as_float(),
        Some(0.25)
    );
}

#[test]
fn test_corrupt_workspace_keeps_network() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.visnet");
    std::fs::write(&path, "{ \"processors\": [ ").unwrap();

    let mut net = workspace();
    let before = net.to_document();
    assert!(matches!(
        net.load_workspace(&path),
        Err(VisError::Serialization(_))
    ));
    assert_eq!(net.to_document(), before);

    assert!(matches!(
        net.load_workspace(dir.path().join("missing.visnet")),
        Err(VisError::Serialization(_))
    ));
}

#[test]
fn test_load_keeps_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.visnet");
    workspace().save_workspace(&path).unwrap();

    let mut net = common::test_network();
    let events = net.subscribe();
    net.load_workspace(&path).unwrap();

    let received: Vec<NetworkEvent> = events.try_iter().collect();
    assert_eq!(
        received.last(),
        Some(&NetworkEvent::Loaded { processors: 3 })
    );

    net.remove_processor("stats").unwrap();
    assert!(events
        .try_iter()
        .any(|e| e == NetworkEvent::ProcessorRemoved("stats".to_string())));
}
