//! Processor network: a dataflow graph of processors evaluated in waves.
//!
//! Processors expose typed inports and outports plus a collection of
//! properties. Outports connect to inports of compatible type; the graph of
//! connections stays acyclic. Properties may additionally be linked to each
//! other, forming an independent (possibly cyclic) graph.
//!
//! # Architecture
//!
//! ```text
//! [BufferSource] ──► [BufferScale] ──► [BufferStatistics]
//!                                 └──► [BufferConcat] ◄── [BufferSource]
//! ```
//!
//! # Design
//!
//! - **Enum dispatch for built-ins**: `BuiltinProcessor` covers the shipped
//!   processors, `AnyProcessor::Plugin` boxes everything else.
//! - **Slot vector**: processors live in `Vec<Option<ProcessorSlot>>` indexed
//!   by `ProcessorId`. Ports are addressed by packed `PortId`s.
//! - **Invalidation levels**: a property change marks its processor, data
//!   changes mark everything downstream. Evaluation brings invalid
//!   processors back to valid in topological waves.
//! - **Events**: edits and evaluation results are broadcast on crossbeam
//!   channels to any number of subscribers.

pub mod document;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod factory;
pub mod id;
mod links;
pub mod port;
pub mod processor;
pub mod processor_network;
pub mod processors;
pub mod property;

pub use document::{ConnectionDocument, NetworkDocument, ProcessorDocument, DOCUMENT_VERSION};
pub use error::{NetworkError, NetworkResult, ProcessorError, ProcessorResult};
pub use evaluator::{EvaluationReport, SkipReason};
pub use events::NetworkEvent;
pub use factory::ProcessorFactory;
pub use id::{PortId, ProcessorId};
pub use port::{Inport, Multiplicity, Outport, Port, PortData, PortDescriptor, PortDirection, PortType};
pub use processor::{
    AnyProcessor, BuiltinProcessor, CodeState, InitContext, ProcessContext, Processor,
    ProcessorInfo, ProcessorMetaData,
};
pub use processor_network::{
    Connection, PortPath, ProcessorNetwork, ProcessorState, PropertyLink, PropertyPath,
};
pub use property::{
    InvalidationLevel, Property, PropertyCollection, PropertyError, PropertyValue,
};
