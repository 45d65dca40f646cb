//! Ports: typed processor endpoints.
//!
//! Each processor declares its ports via a static `PortDescriptor` array. The
//! network instantiates an [`Inport`] or [`Outport`] per descriptor and uses
//! the descriptors to validate connections. Ports refer to their processor by
//! id only; connections are managed by the network.

use crate::datastructures::data::{DataClass, DataRef};
use crate::datastructures::image::Image;
use crate::datastructures::mesh::Mesh;
use crate::network::id::{PortId, ProcessorId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Data-type token carried by a port. Connections require equal tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Buffer,
    Layer,
    Volume,
    Mesh,
    Image,
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// How many upstream connections an inport accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    Single,
    Multiple,
}

/// Static descriptor for a processor's port.
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub identifier: &'static str,
    pub direction: PortDirection,
    pub port_type: PortType,
    pub multiplicity: Multiplicity,
    /// An optional inport is ready while unconnected.
    pub optional: bool,
}

impl PortDescriptor {
    pub const fn input(identifier: &'static str, port_type: PortType) -> Self {
        Self {
            identifier,
            direction: PortDirection::Input,
            port_type,
            multiplicity: Multiplicity::Single,
            optional: false,
        }
    }

    pub const fn multi_input(identifier: &'static str, port_type: PortType) -> Self {
        Self {
            identifier,
            direction: PortDirection::Input,
            port_type,
            multiplicity: Multiplicity::Multiple,
            optional: false,
        }
    }

    pub const fn output(identifier: &'static str, port_type: PortType) -> Self {
        Self {
            identifier,
            direction: PortDirection::Output,
            port_type,
            multiplicity: Multiplicity::Multiple,
            optional: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }
}

/// Shared data travelling through a connection.
#[derive(Debug, Clone)]
pub enum PortData {
    Data(DataRef),
    Mesh(Arc<Mesh>),
    Image(Arc<Image>),
}

impl PortData {
    /// Does not lock the data, so it is safe while a guard is held.
    pub fn port_type(&self) -> PortType {
        match self {
            PortData::Data(data) => match data.class() {
                DataClass::Buffer { .. } => PortType::Buffer,
                DataClass::Layer { .. } => PortType::Layer,
                DataClass::Volume => PortType::Volume,
            },
            PortData::Mesh(_) => PortType::Mesh,
            PortData::Image(_) => PortType::Image,
        }
    }

    /// Pointer identity.
    pub fn ptr_eq(&self, other: &PortData) -> bool {
        match (self, other) {
            (PortData::Data(a), PortData::Data(b)) => a.ptr_eq(b),
            (PortData::Mesh(a), PortData::Mesh(b)) => Arc::ptr_eq(a, b),
            (PortData::Image(a), PortData::Image(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_data(&self) -> Option<&DataRef> {
        match self {
            PortData::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Arc<Mesh>> {
        match self {
            PortData::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Arc<Image>> {
        match self {
            PortData::Image(i) => Some(i),
            _ => None,
        }
    }
}

impl From<DataRef> for PortData {
    fn from(data: DataRef) -> Self {
        PortData::Data(data)
    }
}

impl From<Mesh> for PortData {
    fn from(mesh: Mesh) -> Self {
        PortData::Mesh(Arc::new(mesh))
    }
}

impl From<Image> for PortData {
    fn from(image: Image) -> Self {
        PortData::Image(Arc::new(image))
    }
}

/// Input endpoint. Holds the outports it is connected to, in connection order.
#[derive(Debug, Clone)]
pub struct Inport {
    pub descriptor: PortDescriptor,
    pub owner: ProcessorId,
    pub(crate) connections: Vec<PortId>,
    pub(crate) changed: bool,
}

impl Inport {
    pub fn new(descriptor: PortDescriptor, owner: ProcessorId) -> Self {
        Self {
            descriptor,
            owner,
            connections: Vec::new(),
            changed: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn connected_outports(&self) -> &[PortId] {
        &self.connections
    }

    /// Set when an upstream outport published new data; cleared once the
    /// owning processor has processed.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn accepts_more(&self) -> bool {
        self.descriptor.multiplicity == Multiplicity::Multiple || self.connections.is_empty()
    }
}

/// Output endpoint. Fans out to any number of inports.
#[derive(Debug, Clone)]
pub struct Outport {
    pub descriptor: PortDescriptor,
    pub owner: ProcessorId,
    pub(crate) connections: Vec<PortId>,
    data: Option<PortData>,
}

impl Outport {
    pub fn new(descriptor: PortDescriptor, owner: ProcessorId) -> Self {
        Self {
            descriptor,
            owner,
            connections: Vec::new(),
            data: None,
        }
    }

    pub fn connected_inports(&self) -> &[PortId] {
        &self.connections
    }

    pub fn data(&self) -> Option<&PortData> {
        self.data.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Store `data`. Returns `false` when the same object is already held.
    pub fn set_data(&mut self, data: PortData) -> bool {
        if self.data.as_ref().is_some_and(|held| held.ptr_eq(&data)) {
            return false;
        }
        self.data = Some(data);
        true
    }

    pub fn clear_data(&mut self) -> bool {
        self.data.take().is_some()
    }
}

/// A port instance owned by a processor slot.
#[derive(Debug, Clone)]
pub enum Port {
    In(Inport),
    Out(Outport),
}

impl Port {
    pub fn from_descriptor(descriptor: &PortDescriptor, owner: ProcessorId) -> Self {
        match descriptor.direction {
            PortDirection::Input => Port::In(Inport::new(descriptor.clone(), owner)),
            PortDirection::Output => Port::Out(Outport::new(descriptor.clone(), owner)),
        }
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        match self {
            Port::In(p) => &p.descriptor,
            Port::Out(p) => &p.descriptor,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.descriptor().identifier
    }

    pub fn as_inport(&self) -> Option<&Inport> {
        match self {
            Port::In(p) => Some(p),
            Port::Out(_) => None,
        }
    }

    pub fn as_inport_mut(&mut self) -> Option<&mut Inport> {
        match self {
            Port::In(p) => Some(p),
            Port::Out(_) => None,
        }
    }

    pub fn as_outport(&self) -> Option<&Outport> {
        match self {
            Port::Out(p) => Some(p),
            Port::In(_) => None,
        }
    }

    pub fn as_outport_mut(&mut self) -> Option<&mut Outport> {
        match self {
            Port::Out(p) => Some(p),
            Port::In(_) => None,
        }
    }
}
