//! Network and processor error types.

use crate::datastructures::error::DataError;
use crate::network::port::PortType;
use crate::network::property::PropertyError;
use thiserror::Error;

/// Structural errors raised synchronously by network edits. A rejected edit
/// leaves the network unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Port type mismatch: {outport} carries {found}, {inport} expects {expected}")]
    TypeMismatch {
        outport: String,
        inport: String,
        found: PortType,
        expected: PortType,
    },

    #[error("Connecting {outport} to {inport} would create a cycle")]
    CycleDetected { outport: String, inport: String },

    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("Unknown port: {0}")]
    UnknownPort(String),

    #[error("A processor named {0} already exists")]
    DuplicateIdentifier(String),

    #[error("Invalid processor identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("The network has used all {limit} processor slots")]
    ProcessorCapacityExceeded { limit: usize },

    #[error("{processor} declares {count} ports, at most {limit} are supported")]
    TooManyPorts {
        processor: String,
        count: usize,
        limit: usize,
    },

    #[error("Inport {0} accepts a single connection and is already connected")]
    PortOccupied(String),

    #[error("{outport} is already connected to {inport}")]
    DuplicateConnection { outport: String, inport: String },

    #[error("No connection from {outport} to {inport}")]
    ConnectionNotFound { outport: String, inport: String },

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Port {port} carries {expected}, got {found}")]
    PortDataMismatch {
        port: String,
        expected: PortType,
        found: PortType,
    },

    #[error("No link from {source_property} to {destination}")]
    LinkNotFound {
        source_property: String,
        destination: String,
    },

    #[error("{source_property} is already linked to {destination}")]
    DuplicateLink {
        source_property: String,
        destination: String,
    },

    #[error("Invalid link: {0}")]
    InvalidLink(String),

    #[error("Unknown processor class: {0}")]
    UnknownClass(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Unsupported document version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error(transparent)]
    Property(#[from] PropertyError),
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Errors raised by a processor's lifecycle hooks. They abort only the
/// failing processor.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Resource acquisition failed: {0}")]
    ResourceAcquisitionFailed(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("No data on inport {0}")]
    MissingInput(String),

    #[error("Port {port} carries {expected}, got {found}")]
    PortType {
        port: String,
        expected: PortType,
        found: PortType,
    },

    #[error("Unknown port: {0}")]
    UnknownPort(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Property {property} is not a {expected}")]
    PropertyType {
        property: String,
        expected: &'static str,
    },
}

impl ProcessorError {
    pub fn processing(message: impl Into<String>) -> Self {
        ProcessorError::ProcessingFailed(message.into())
    }
}

pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;
