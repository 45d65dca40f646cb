//! The processor network: processors, the connections between their ports
//! and the links between their properties.
//!
//! Processors live in a slot vector indexed by [`ProcessorId`]; slots are
//! never reused, so slot order is insertion order. Connections are kept both
//! as a flat list (for queries and persistence) and on the ports themselves
//! (for evaluation). Every structural edit validates first and commits
//! second, so a rejected edit leaves the network untouched.

use crate::config::EvaluationSettings;
use crate::context::ApplicationContext;
use crate::datastructures::converter::ConverterRegistry;
use crate::network::error::{NetworkError, NetworkResult};
use crate::network::events::{NetworkEvent, Observers};
use crate::network::id::{PortId, ProcessorId};
use crate::network::port::{Inport, Outport, Port, PortData, PortDescriptor};
use crate::network::processor::{AnyProcessor, InitContext, ProcessorInfo, ProcessorMetaData};
use crate::network::property::{InvalidationLevel, Property, PropertyCollection};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a processor inside a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorState {
    Constructed,
    Initialized,
    /// `initialize` failed. The processor stays in the network but is never
    /// processed.
    InitializationFailed(String),
    Deinitialized,
}

/// A directed connection from an outport to an inport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub outport: PortId,
    pub inport: PortId,
}

/// `processor.port` address of a port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortPath {
    pub processor: String,
    pub port: String,
}

impl PortPath {
    pub fn new(processor: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.port)
    }
}

/// `processor.property` address of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyPath {
    pub processor: String,
    pub property: String,
}

impl PropertyPath {
    pub fn new(processor: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.processor, self.property)
    }
}

/// One-directional property link. Changing the source copies its value to
/// the destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyLink {
    pub source: PropertyPath,
    pub destination: PropertyPath,
}

impl PropertyLink {
    pub fn new(source: PropertyPath, destination: PropertyPath) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// A processor together with its ports, properties and network state.
pub(super) struct ProcessorSlot {
    pub identifier: String,
    pub processor: AnyProcessor,
    pub descriptors: Vec<PortDescriptor>,
    pub ports: Vec<Port>,
    pub properties: PropertyCollection,
    pub metadata: ProcessorMetaData,
    pub state: ProcessorState,
    pub invalidation: InvalidationLevel,
    pub last_error: Option<String>,
}

impl ProcessorSlot {
    fn initialize(&mut self, registry: &ConverterRegistry) {
        let ctx = InitContext::new(&self.identifier, &self.properties, registry);
        match self.processor.initialize(&ctx) {
            Ok(()) => self.state = ProcessorState::Initialized,
            Err(e) => {
                tracing::error!("Processor {} failed to initialize: {}", self.identifier, e);
                let message = e.to_string();
                self.last_error = Some(message.clone());
                self.state = ProcessorState::InitializationFailed(message);
            }
        }
    }

    fn deinitialize(&mut self) {
        if self.state != ProcessorState::Deinitialized {
            self.processor.deinitialize();
            self.state = ProcessorState::Deinitialized;
        }
    }

    pub fn inports(&self) -> impl Iterator<Item = &Inport> {
        self.ports.iter().filter_map(Port::as_inport)
    }
}

/// The dataflow graph.
pub struct ProcessorNetwork {
    pub(super) context: Arc<ApplicationContext>,
    pub(super) settings: EvaluationSettings,
    pub(super) slots: Vec<Option<ProcessorSlot>>,
    /// Bound on `slots.len()`, at most [`ProcessorId::CAPACITY`].
    pub(super) slot_limit: usize,
    pub(super) by_identifier: HashMap<String, ProcessorId>,
    pub(super) connections: Vec<Connection>,
    pub(super) links: Vec<PropertyLink>,
    pub(super) observers: Observers,
    pub(super) pass: u64,
}

impl ProcessorNetwork {
    pub fn new(context: Arc<ApplicationContext>, settings: EvaluationSettings) -> Self {
        Self {
            context,
            settings,
            slots: Vec::new(),
            slot_limit: ProcessorId::CAPACITY,
            by_identifier: HashMap::new(),
            connections: Vec::new(),
            links: Vec::new(),
            observers: Observers::default(),
            pass: 0,
        }
    }

    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EvaluationSettings) {
        self.settings = settings;
    }

    /// Number of processors.
    pub fn len(&self) -> usize {
        self.by_identifier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty()
    }

    /// Number of completed evaluation passes.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Receive [`NetworkEvent`]s from now on.
    pub fn subscribe(&mut self) -> Receiver<NetworkEvent> {
        self.observers.subscribe()
    }

    // ── Processors ──

    /// Add and initialize a processor. A processor whose `initialize` fails is
    /// still added; it is reported and skipped by every evaluation pass.
    pub fn add_processor(
        &mut self,
        identifier: impl Into<String>,
        processor: impl Into<AnyProcessor>,
    ) -> NetworkResult<ProcessorId> {
        let identifier = identifier.into();
        if identifier.is_empty() || identifier.contains('.') {
            return Err(NetworkError::InvalidIdentifier(identifier));
        }
        if self.by_identifier.contains_key(&identifier) {
            return Err(NetworkError::DuplicateIdentifier(identifier));
        }

        // Slots are not reused, so removed processors still count here.
        let id = ProcessorId::from_index(self.slots.len())
            .filter(|id| id.index() < self.slot_limit)
            .ok_or(NetworkError::ProcessorCapacityExceeded {
                limit: self.slot_limit,
            })?;
        let processor = processor.into();
        let descriptors = processor.ports().to_vec();
        if descriptors.len() > PortId::MAX_PORTS {
            return Err(NetworkError::TooManyPorts {
                processor: identifier,
                count: descriptors.len(),
                limit: PortId::MAX_PORTS,
            });
        }
        let ports = descriptors
            .iter()
            .map(|d| Port::from_descriptor(d, id))
            .collect();
        let properties = processor.properties().into_iter().collect();
        let class = processor.info().class_identifier;

        let mut slot = ProcessorSlot {
            identifier: identifier.clone(),
            processor,
            descriptors,
            ports,
            properties,
            metadata: ProcessorMetaData::default(),
            state: ProcessorState::Constructed,
            invalidation: InvalidationLevel::InvalidOutput,
            last_error: None,
        };
        slot.initialize(self.context.converters());

        tracing::info!("Added processor {} ({})", identifier, class);
        self.slots.push(Some(slot));
        self.by_identifier.insert(identifier.clone(), id);
        self.observers.emit(NetworkEvent::ProcessorAdded(identifier));
        Ok(id)
    }

    /// Create a processor through the context's factory and add it.
    pub fn add_processor_by_class(
        &mut self,
        identifier: impl Into<String>,
        class_identifier: &str,
    ) -> NetworkResult<ProcessorId> {
        let processor = self.context.processors().create(class_identifier)?;
        self.add_processor(identifier, processor)
    }

    /// Remove a processor: its connections and links first, then deinitialize
    /// and drop it.
    pub fn remove_processor(&mut self, identifier: &str) -> NetworkResult<()> {
        let id = self.processor_id(identifier)?;

        let attached: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.outport.processor() == id || c.inport.processor() == id)
            .copied()
            .collect();
        for connection in attached {
            self.detach(connection);
        }

        let (removed, kept): (Vec<PropertyLink>, Vec<PropertyLink>) =
            std::mem::take(&mut self.links).into_iter().partition(|link| {
                link.source.processor == identifier || link.destination.processor == identifier
            });
        self.links = kept;
        for link in removed {
            self.observers.emit(NetworkEvent::LinkRemoved {
                source: link.source.to_string(),
                destination: link.destination.to_string(),
            });
        }

        let mut slot = self.slots[id.index()]
            .take()
            .ok_or_else(|| NetworkError::UnknownProcessor(identifier.to_string()))?;
        self.by_identifier.remove(identifier);
        slot.deinitialize();

        tracing::info!("Removed processor {}", identifier);
        self.observers
            .emit(NetworkEvent::ProcessorRemoved(identifier.to_string()));
        Ok(())
    }

    pub fn processor_id(&self, identifier: &str) -> NetworkResult<ProcessorId> {
        self.by_identifier
            .get(identifier)
            .copied()
            .ok_or_else(|| NetworkError::UnknownProcessor(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.by_identifier.contains_key(identifier)
    }

    pub(super) fn slot(&self, id: ProcessorId) -> NetworkResult<&ProcessorSlot> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| NetworkError::UnknownProcessor(id.to_string()))
    }

    pub(super) fn slot_mut(&mut self, id: ProcessorId) -> NetworkResult<&mut ProcessorSlot> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| NetworkError::UnknownProcessor(id.to_string()))
    }

    fn slot_by_name(&self, identifier: &str) -> NetworkResult<&ProcessorSlot> {
        self.slot(self.processor_id(identifier)?)
    }

    /// Identifiers in insertion order.
    pub fn processor_identifiers(&self) -> Vec<&str> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| slot.identifier.as_str())
            .collect()
    }

    pub fn processor(&self, identifier: &str) -> NetworkResult<&AnyProcessor> {
        self.slot_by_name(identifier).map(|slot| &slot.processor)
    }

    pub fn processor_info(&self, identifier: &str) -> NetworkResult<ProcessorInfo> {
        self.slot_by_name(identifier)
            .map(|slot| slot.processor.info())
    }

    pub fn ports(&self, identifier: &str) -> NetworkResult<&[Port]> {
        self.slot_by_name(identifier)
            .map(|slot| slot.ports.as_slice())
    }

    pub fn properties(&self, identifier: &str) -> NetworkResult<&PropertyCollection> {
        self.slot_by_name(identifier).map(|slot| &slot.properties)
    }

    pub fn property(&self, processor: &str, property: &str) -> NetworkResult<&Property> {
        self.properties(processor)?
            .get(property)
            .ok_or_else(|| NetworkError::UnknownProperty(format!("{processor}.{property}")))
    }

    pub fn metadata(&self, identifier: &str) -> NetworkResult<&ProcessorMetaData> {
        self.slot_by_name(identifier).map(|slot| &slot.metadata)
    }

    pub fn set_metadata(
        &mut self,
        identifier: &str,
        metadata: ProcessorMetaData,
    ) -> NetworkResult<()> {
        let id = self.processor_id(identifier)?;
        self.slot_mut(id)?.metadata = metadata;
        Ok(())
    }

    pub fn state(&self, identifier: &str) -> NetworkResult<&ProcessorState> {
        self.slot_by_name(identifier).map(|slot| &slot.state)
    }

    pub fn invalidation_level(&self, identifier: &str) -> NetworkResult<InvalidationLevel> {
        self.slot_by_name(identifier)
            .map(|slot| slot.invalidation)
    }

    pub fn is_valid(&self, identifier: &str) -> NetworkResult<bool> {
        Ok(self.invalidation_level(identifier)? == InvalidationLevel::Valid)
    }

    /// Error of the last failed `initialize` or `process`, cleared on success.
    pub fn last_error(&self, identifier: &str) -> NetworkResult<Option<&str>> {
        self.slot_by_name(identifier)
            .map(|slot| slot.last_error.as_deref())
    }

    /// `base` when free, otherwise `base2`, `base3`, ...
    pub fn unique_identifier(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    // ── Ports & connections ──

    pub fn port_id(&self, processor: &str, port: &str) -> NetworkResult<PortId> {
        let id = self.processor_id(processor)?;
        let slot = self.slot(id)?;
        slot.ports
            .iter()
            .position(|p| p.identifier() == port)
            .map(|index| PortId::new(id, index as u16))
            .ok_or_else(|| NetworkError::UnknownPort(format!("{processor}.{port}")))
    }

    pub fn port_path(&self, port: PortId) -> Option<PortPath> {
        let slot = self.slot(port.processor()).ok()?;
        let p = slot.ports.get(port.port_index() as usize)?;
        Some(PortPath::new(slot.identifier.clone(), p.identifier()))
    }

    pub(super) fn describe(&self, port: PortId) -> String {
        self.port_path(port)
            .map(|path| path.to_string())
            .unwrap_or_else(|| format!("{port:?}"))
    }

    pub(super) fn port(&self, port: PortId) -> NetworkResult<&Port> {
        self.slot(port.processor())?
            .ports
            .get(port.port_index() as usize)
            .ok_or_else(|| NetworkError::UnknownPort(format!("{port:?}")))
    }

    pub(super) fn port_mut(&mut self, port: PortId) -> NetworkResult<&mut Port> {
        self.slot_mut(port.processor())?
            .ports
            .get_mut(port.port_index() as usize)
            .ok_or_else(|| NetworkError::UnknownPort(format!("{port:?}")))
    }

    fn outport(&self, port: PortId) -> NetworkResult<&Outport> {
        self.port(port)?.as_outport().ok_or_else(|| {
            NetworkError::InvalidConnection(format!("{} is not an outport", self.describe(port)))
        })
    }

    fn inport(&self, port: PortId) -> NetworkResult<&Inport> {
        self.port(port)?.as_inport().ok_or_else(|| {
            NetworkError::InvalidConnection(format!("{} is not an inport", self.describe(port)))
        })
    }

    /// Connect `outport` to `inport`.
    ///
    /// Rejected when the port types differ, the connection exists, a
    /// single inport is already connected, or the connection would close a
    /// cycle. The target processor becomes invalid.
    pub fn add_connection(&mut self, outport: PortId, inport: PortId) -> NetworkResult<()> {
        let out = self.outport(outport)?;
        let inp = self.inport(inport)?;

        if out.descriptor.port_type != inp.descriptor.port_type {
            return Err(NetworkError::TypeMismatch {
                outport: self.describe(outport),
                inport: self.describe(inport),
                found: out.descriptor.port_type,
                expected: inp.descriptor.port_type,
            });
        }
        let connection = Connection { outport, inport };
        if self.connections.contains(&connection) {
            return Err(NetworkError::DuplicateConnection {
                outport: self.describe(outport),
                inport: self.describe(inport),
            });
        }
        if !inp.accepts_more() {
            return Err(NetworkError::PortOccupied(self.describe(inport)));
        }
        if outport.processor() == inport.processor()
            || self.reaches(inport.processor(), outport.processor())
        {
            return Err(NetworkError::CycleDetected {
                outport: self.describe(outport),
                inport: self.describe(inport),
            });
        }

        // ── commit ──
        self.connections.push(connection);
        if let Port::Out(p) = self.port_mut(outport)? {
            p.connections.push(inport);
        }
        if let Port::In(p) = self.port_mut(inport)? {
            p.connections.push(outport);
            p.changed = true;
        }

        let (from, to) = (self.describe(outport), self.describe(inport));
        tracing::info!("Connected {} -> {}", from, to);
        self.observers.emit(NetworkEvent::ConnectionAdded {
            outport: from,
            inport: to,
        });
        self.invalidate_id(inport.processor(), InvalidationLevel::InvalidOutput);
        Ok(())
    }

    /// Connect by identifiers.
    pub fn connect(
        &mut self,
        out_processor: &str,
        outport: &str,
        in_processor: &str,
        inport: &str,
    ) -> NetworkResult<()> {
        let outport = self.port_id(out_processor, outport)?;
        let inport = self.port_id(in_processor, inport)?;
        self.add_connection(outport, inport)
    }

    /// Remove a connection. The target processor becomes invalid.
    pub fn remove_connection(&mut self, outport: PortId, inport: PortId) -> NetworkResult<()> {
        let connection = Connection { outport, inport };
        if !self.connections.contains(&connection) {
            return Err(NetworkError::ConnectionNotFound {
                outport: self.describe(outport),
                inport: self.describe(inport),
            });
        }
        self.detach(connection);
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        out_processor: &str,
        outport: &str,
        in_processor: &str,
        inport: &str,
    ) -> NetworkResult<()> {
        let outport = self.port_id(out_processor, outport)?;
        let inport = self.port_id(in_processor, inport)?;
        self.remove_connection(outport, inport)
    }

    fn detach(&mut self, connection: Connection) {
        let Connection { outport, inport } = connection;
        self.connections.retain(|c| *c != connection);
        if let Ok(Port::Out(p)) = self.port_mut(outport) {
            p.connections.retain(|c| *c != inport);
        }
        if let Ok(Port::In(p)) = self.port_mut(inport) {
            p.connections.retain(|c| *c != outport);
            p.changed = true;
        }

        let (from, to) = (self.describe(outport), self.describe(inport));
        tracing::info!("Disconnected {} -> {}", from, to);
        self.observers.emit(NetworkEvent::ConnectionRemoved {
            outport: from,
            inport: to,
        });
        self.invalidate_id(inport.processor(), InvalidationLevel::InvalidOutput);
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections as `processor.port` pairs, in connection order.
    pub fn connection_paths(&self) -> Vec<(PortPath, PortPath)> {
        self.connections
            .iter()
            .filter_map(|c| Some((self.port_path(c.outport)?, self.port_path(c.inport)?)))
            .collect()
    }

    pub fn is_connected(&self, outport: PortId, inport: PortId) -> bool {
        self.connections.contains(&Connection { outport, inport })
    }

    /// Publish data on an outport from outside an evaluation pass. Returns
    /// whether the outport's data changed; when it did, connected processors
    /// become invalid.
    pub fn set_outport_data(
        &mut self,
        processor: &str,
        port: &str,
        data: impl Into<PortData>,
    ) -> NetworkResult<bool> {
        let port_id = self.port_id(processor, port)?;
        let data = data.into();
        let outport = self.outport(port_id)?;
        if data.port_type() != outport.descriptor.port_type {
            return Err(NetworkError::PortDataMismatch {
                port: self.describe(port_id),
                expected: outport.descriptor.port_type,
                found: data.port_type(),
            });
        }
        let targets: Vec<ProcessorId> = outport
            .connections
            .iter()
            .map(|p| p.processor())
            .collect();

        let changed = self.publish(port_id, data);
        if changed {
            for target in targets {
                self.invalidate_id(target, InvalidationLevel::InvalidOutput);
            }
        }
        Ok(changed)
    }

    pub fn outport_data(&self, processor: &str, port: &str) -> NetworkResult<Option<&PortData>> {
        let port_id = self.port_id(processor, port)?;
        Ok(self.outport(port_id)?.data())
    }

    /// Data held by the outports connected to an inport, in connection order.
    pub fn inport_data(&self, processor: &str, port: &str) -> NetworkResult<Vec<PortData>> {
        let port_id = self.port_id(processor, port)?;
        Ok(self.gather_inputs(self.inport(port_id)?))
    }

    pub fn is_inport_ready(&self, processor: &str, port: &str) -> NetworkResult<bool> {
        let port_id = self.port_id(processor, port)?;
        Ok(self.inport_ready(self.inport(port_id)?))
    }

    /// Connected (or optional) and every connected outport holds data.
    pub(super) fn inport_ready(&self, inport: &Inport) -> bool {
        if !inport.is_connected() {
            return inport.descriptor.optional;
        }
        inport
            .connections
            .iter()
            .all(|&out| self.outport(out).is_ok_and(Outport::has_data))
    }

    pub(super) fn gather_inputs(&self, inport: &Inport) -> Vec<PortData> {
        inport
            .connections
            .iter()
            .filter_map(|&out| self.outport(out).ok().and_then(Outport::data).cloned())
            .collect()
    }

    /// Store data on an outport and flag connected inports as changed.
    /// Returns `false` when the outport already held the same object.
    pub(super) fn publish(&mut self, port: PortId, data: PortData) -> bool {
        let targets = match self.port_mut(port) {
            Ok(Port::Out(outport)) => {
                if !outport.set_data(data) {
                    return false;
                }
                outport.connections.clone()
            }
            _ => return false,
        };
        for target in targets {
            if let Ok(Port::In(inport)) = self.port_mut(target) {
                inport.changed = true;
            }
        }
        true
    }

    // ── Invalidation ──

    /// Invalidate a processor at `level` and everything downstream of it at
    /// least at `InvalidOutput`.
    pub fn invalidate(&mut self, identifier: &str, level: InvalidationLevel) -> NetworkResult<()> {
        let id = self.processor_id(identifier)?;
        self.invalidate_id(id, level);
        Ok(())
    }

    pub(super) fn invalidate_id(&mut self, id: ProcessorId, level: InvalidationLevel) {
        if level == InvalidationLevel::Valid {
            return;
        }
        let reached = self.downstream_closure(&[id]);
        for (index, _) in reached.iter().enumerate().filter(|(_, r)| **r) {
            let target = if index == id.index() {
                level
            } else {
                InvalidationLevel::InvalidOutput
            };
            let Some(slot) = self.slots[index].as_mut() else {
                continue;
            };
            if target > slot.invalidation {
                slot.invalidation = target;
                tracing::trace!("Invalidated {} ({:?})", slot.identifier, target);
                self.observers.emit(NetworkEvent::ProcessorInvalidated {
                    identifier: slot.identifier.clone(),
                    level: target,
                });
            }
        }
    }

    /// Processors reachable from `seeds` along connections, seeds included.
    pub(super) fn downstream_closure(&self, seeds: &[ProcessorId]) -> Vec<bool> {
        let mut reached = vec![false; self.slots.len()];
        let mut queue: VecDeque<ProcessorId> = seeds.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let Some(seen) = reached.get_mut(id.index()) else {
                continue;
            };
            if std::mem::replace(seen, true) {
                continue;
            }
            for c in &self.connections {
                if c.outport.processor() == id {
                    queue.push_back(c.inport.processor());
                }
            }
        }
        reached
    }

    /// Processors feeding `id` directly.
    pub(super) fn upstream_of(&self, id: ProcessorId) -> impl Iterator<Item = ProcessorId> + '_ {
        self.connections
            .iter()
            .filter(move |c| c.inport.processor() == id)
            .map(|c| c.outport.processor())
    }

    /// Whether `to` is reachable from `from` along connections.
    pub(super) fn reaches(&self, from: ProcessorId, to: ProcessorId) -> bool {
        let mut visited = vec![false; self.slots.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.index();
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;

            for c in &self.connections {
                if c.outport.processor() == current {
                    stack.push(c.inport.processor());
                }
            }
        }
        false
    }
}

impl Drop for ProcessorNetwork {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.deinitialize();
        }
    }
}

impl fmt::Debug for ProcessorNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorNetwork")
            .field("processors", &self.processor_identifiers())
            .field("connections", &self.connections.len())
            .field("links", &self.links.len())
            .field("pass", &self.pass)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::processors::{BufferScale, BufferSource, BufferStatistics, MeshAssembler};

    fn network() -> ProcessorNetwork {
        let context = Arc::new(ApplicationContext::with_default_modules("test"));
        ProcessorNetwork::new(context, EvaluationSettings::default())
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let mut net = network();
        net.add_processor("source", BufferSource).unwrap();
        assert_eq!(
            net.add_processor("source", BufferSource),
            Err(NetworkError::DuplicateIdentifier("source".into()))
        );
        assert!(matches!(
            net.add_processor("a.b", BufferSource),
            Err(NetworkError::InvalidIdentifier(_))
        ));
        assert_eq!(net.len(), 1);
    }

    #[test]
    fn test_connection_type_checked() {
        let mut net = network();
        net.add_processor("source", BufferSource).unwrap();
        net.add_processor("mesh", MeshAssembler).unwrap();
        net.add_processor("stats", BufferStatistics::default()).unwrap();
        net.connect("source", "outport", "mesh", "positions").unwrap();
        let err = net.connect("mesh", "mesh", "stats", "inport").unwrap_err();
        assert!(matches!(err, NetworkError::TypeMismatch { .. }));
        assert_eq!(net.connections().len(), 1);
    }

    #[test]
    fn test_single_inport_occupied() {
        let mut net = network();
        net.add_processor("a", BufferSource).unwrap();
        net.add_processor("b", BufferSource).unwrap();
        net.add_processor("scale", BufferScale::default()).unwrap();
        net.connect("a", "outport", "scale", "inport").unwrap();
        assert!(matches!(
            net.connect("a", "outport", "scale", "inport"),
            Err(NetworkError::DuplicateConnection { .. })
        ));
        assert!(matches!(
            net.connect("b", "outport", "scale", "inport"),
            Err(NetworkError::PortOccupied(_))
        ));
    }

    #[test]
    fn test_direction_checked() {
        let mut net = network();
        net.add_processor("a", BufferScale::default()).unwrap();
        net.add_processor("b", BufferScale::default()).unwrap();
        assert!(matches!(
            net.connect("a", "inport", "b", "inport"),
            Err(NetworkError::InvalidConnection(_))
        ));
    }

    #[test]
    fn test_self_connection_is_cycle() {
        let mut net = network();
        net.add_processor("scale", BufferScale::default()).unwrap();
        assert!(matches!(
            net.connect("scale", "outport", "scale", "inport"),
            Err(NetworkError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_remove_processor_drops_connections() {
        let mut net = network();
        net.add_processor("source", BufferSource).unwrap();
        net.add_processor("scale", BufferScale::default()).unwrap();
        net.add_processor("stats", BufferStatistics::default()).unwrap();
        net.connect("source", "outport", "scale", "inport").unwrap();
        net.connect("scale", "outport", "stats", "inport").unwrap();

        net.remove_processor("scale").unwrap();
        assert!(net.connections().is_empty());
        assert_eq!(net.processor_identifiers(), vec!["source", "stats"]);
        assert!(!net.is_inport_ready("stats", "inport").unwrap());
        assert!(matches!(
            net.remove_processor("scale"),
            Err(NetworkError::UnknownProcessor(_))
        ));
    }

    #[test]
    fn test_exhausted_slots_reject_new_processors() {
        let mut net = network();
        assert_eq!(net.slot_limit, ProcessorId::CAPACITY);
        net.slot_limit = 3;
        net.add_processor("a", BufferSource).unwrap();
        for _ in 0..2 {
            net.add_processor("tmp", BufferSource).unwrap();
            net.remove_processor("tmp").unwrap();
        }

        // Removed processors do not give their slots back.
        assert_eq!(
            net.add_processor("b", BufferStatistics::default()),
            Err(NetworkError::ProcessorCapacityExceeded { limit: 3 })
        );
        assert!(!net.contains("b"));
        assert_eq!(net.len(), 1);
        assert_eq!(net.port_id("a", "outport").unwrap().processor(), ProcessorId(0));
    }

    #[derive(Debug)]
    struct ManyPorts(Vec<PortDescriptor>);

    impl crate::network::processor::Processor for ManyPorts {
        fn info(&self) -> ProcessorInfo {
            BufferSource::INFO
        }

        fn ports(&self) -> &[PortDescriptor] {
            &self.0
        }

        fn process(
            &mut self,
            _ctx: &mut crate::network::processor::ProcessContext,
        ) -> crate::network::error::ProcessorResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_port_count_is_limited() {
        use crate::network::port::PortType;

        let mut net = network();
        let ports = vec![PortDescriptor::output("outport", PortType::Buffer); PortId::MAX_PORTS + 1];
        assert_eq!(
            net.add_processor("wide", AnyProcessor::plugin(ManyPorts(ports))),
            Err(NetworkError::TooManyPorts {
                processor: "wide".into(),
                count: 4097,
                limit: 4096
            })
        );
        assert!(net.is_empty());
    }

    #[test]
    fn test_unique_identifier() {
        let mut net = network();
        assert_eq!(net.unique_identifier("source"), "source");
        net.add_processor("source", BufferSource).unwrap();
        net.add_processor("source2", BufferSource).unwrap();
        assert_eq!(net.unique_identifier("source"), "source3");
    }

    #[test]
    fn test_remove_connection_invalidates_target() {
        let mut net = network();
        net.add_processor("source", BufferSource).unwrap();
        net.add_processor("stats", BufferStatistics::default()).unwrap();
        net.connect("source", "outport", "stats", "inport").unwrap();
        net.slot_mut(ProcessorId(1)).unwrap().invalidation = InvalidationLevel::Valid;

        net.disconnect("source", "outport", "stats", "inport").unwrap();
        assert!(!net.is_valid("stats").unwrap());
        assert!(matches!(
            net.disconnect("source", "outport", "stats", "inport"),
            Err(NetworkError::ConnectionNotFound { .. })
        ));
    }

    #[test]
    fn test_events_emitted() {
        let mut net = network();
        let rx = net.subscribe();
        net.add_processor("source", BufferSource).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            NetworkEvent::ProcessorAdded("source".into())
        );
    }
}
