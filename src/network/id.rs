//! Processor and port handles.
//!
//! A [`ProcessorId`] is the processor's slot in the network and doubles as
//! its insertion rank. A [`PortId`] packs the slot and the port's position in
//! the processor's descriptor list into one `u32`; the network refuses
//! processors or port lists that would not fit.

use std::fmt;

/// Slot of a processor in its network.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ProcessorId(pub u32);

impl ProcessorId {
    /// Number of slots a [`PortId`] can address.
    pub const CAPACITY: usize = 1 << PortId::PROCESSOR_BITS;

    /// Id for the slot at `index`, if a [`PortId`] can address it.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < Self::CAPACITY).then_some(ProcessorId(index as u32))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessorId({})", self.0)
    }
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Port handle: processor slot in the high 20 bits, port position in the low 12.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(pub u32);

impl PortId {
    const PROCESSOR_BITS: u32 = 20;
    const PORT_BITS: u32 = 32 - Self::PROCESSOR_BITS;
    const PORT_MASK: u32 = (1 << Self::PORT_BITS) - 1;

    /// Ports a single processor may declare.
    pub const MAX_PORTS: usize = 1 << Self::PORT_BITS;

    /// Callers keep `processor` below [`ProcessorId::CAPACITY`] and
    /// `port_index` below [`PortId::MAX_PORTS`].
    pub fn new(processor: ProcessorId, port_index: u16) -> Self {
        debug_assert!(processor.index() < ProcessorId::CAPACITY);
        debug_assert!((port_index as usize) < Self::MAX_PORTS);
        Self((processor.0 << Self::PORT_BITS) | (port_index as u32 & Self::PORT_MASK))
    }

    #[inline]
    pub fn processor(self) -> ProcessorId {
        ProcessorId(self.0 >> Self::PORT_BITS)
    }

    #[inline]
    pub fn port_index(self) -> u16 {
        (self.0 & Self::PORT_MASK) as u16
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortId({}:{})", self.processor().0, self.port_index())
    }
}
