//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::sync::Arc;
use visnet::config::EvaluationSettings;
use visnet::datastructures::{BufferType, Data, DataFormat, DataRef, RamStorage, RepresentationKind};
use visnet::{ApplicationContext, ProcessorNetwork};

/// Context with the built-in modules registered
pub fn test_context() -> Arc<ApplicationContext> {
    Arc::new(ApplicationContext::with_default_modules("test"))
}

/// Empty network with sequential evaluation
pub fn test_network() -> ProcessorNetwork {
    ProcessorNetwork::new(test_context(), EvaluationSettings::default())
}

/// FLOAT32 position buffer holding `values`
pub fn float_buffer(values: &[f32]) -> Data {
    Data::buffer(
        BufferType::Position,
        DataFormat::FLOAT32,
        RamStorage::Float32(values.to_vec()),
    )
    .unwrap()
}

/// Scalars on `processor.port`, read through the RAM representation
pub fn outport_values(network: &ProcessorNetwork, processor: &str, port: &str) -> Vec<f64> {
    let data = network
        .outport_data(processor, port)
        .unwrap()
        .and_then(|d| d.as_data())
        .cloned()
        .unwrap_or_else(|| panic!("{processor}.{port} holds no buffer"));
    ram_values(&data, network)
}

pub fn ram_values(data: &DataRef, network: &ProcessorNetwork) -> Vec<f64> {
    let mut guard = data.lock();
    guard
        .get_representation(RepresentationKind::Ram, network.context().converters())
        .unwrap()
        .as_ram()
        .unwrap()
        .to_f64_vec()
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
