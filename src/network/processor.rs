//! Processor abstraction for the network.
//!
//! Two-layer design:
//! - **`Processor` trait** for extensibility; modules and plugins implement it.
//! - **`BuiltinProcessor` enum** for the processors shipped with the crate,
//!   dispatched by `match`.
//!
//! `AnyProcessor` wraps either variant so the network can handle both uniformly.

use crate::datastructures::converter::ConverterRegistry;
use crate::datastructures::data::DataRef;
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::port::{PortData, PortDescriptor, PortDirection};
use crate::network::processors::{
    BufferConcat, BufferScale, BufferSource, BufferStatistics, ImageSource, MeshAssembler,
};
use crate::network::property::{Property, PropertyCollection, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maturity tag of a processor implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeState {
    Experimental,
    Stable,
    Broken,
}

impl fmt::Display for CodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static description of a processor class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorInfo {
    pub class_identifier: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub code_state: CodeState,
    pub tags: &'static [&'static str],
}

/// Editor-side state persisted with the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorMetaData {
    pub position: [i32; 2],
    pub visible: bool,
    pub selected: bool,
}

impl Default for ProcessorMetaData {
    fn default() -> Self {
        Self {
            position: [0, 0],
            visible: true,
            selected: false,
        }
    }
}

fn typed_property<'p, T>(
    properties: &'p PropertyCollection,
    identifier: &str,
    expected: &'static str,
    get: impl FnOnce(&'p PropertyValue) -> Option<T>,
) -> ProcessorResult<T> {
    let property = properties
        .get(identifier)
        .ok_or_else(|| ProcessorError::UnknownProperty(identifier.to_string()))?;
    get(property.value()).ok_or_else(|| ProcessorError::PropertyType {
        property: identifier.to_string(),
        expected,
    })
}

macro_rules! property_getters {
    ($ty:ty) => {
        impl $ty {
            pub fn properties(&self) -> &PropertyCollection {
                self.properties
            }

            pub fn property(&self, identifier: &str) -> ProcessorResult<&Property> {
                self.properties
                    .get(identifier)
                    .ok_or_else(|| ProcessorError::UnknownProperty(identifier.to_string()))
            }

            pub fn bool(&self, identifier: &str) -> ProcessorResult<bool> {
                typed_property(self.properties, identifier, "Bool", PropertyValue::as_bool)
            }

            pub fn int(&self, identifier: &str) -> ProcessorResult<i64> {
                typed_property(self.properties, identifier, "Int", PropertyValue::as_int)
            }

            pub fn float(&self, identifier: &str) -> ProcessorResult<f64> {
                typed_property(self.properties, identifier, "Float", PropertyValue::as_float)
            }

            pub fn float_list(&self, identifier: &str) -> ProcessorResult<&[f64]> {
                typed_property(
                    self.properties,
                    identifier,
                    "FloatList",
                    PropertyValue::as_float_list,
                )
            }

            pub fn text(&self, identifier: &str) -> ProcessorResult<&str> {
                typed_property(self.properties, identifier, "String", PropertyValue::as_str)
            }

            pub fn ivec2(&self, identifier: &str) -> ProcessorResult<[i32; 2]> {
                typed_property(self.properties, identifier, "IVec2", PropertyValue::as_ivec2)
            }

            pub fn vec3(&self, identifier: &str) -> ProcessorResult<[f64; 3]> {
                typed_property(self.properties, identifier, "Vec3", PropertyValue::as_vec3)
            }

            pub fn registry(&self) -> &ConverterRegistry {
                self.registry
            }

            pub fn identifier(&self) -> &str {
                self.identifier
            }
        }
    };
}

/// Context passed to `initialize` and `initialize_resources`.
pub struct InitContext<'a> {
    identifier: &'a str,
    properties: &'a PropertyCollection,
    registry: &'a ConverterRegistry,
}

impl<'a> InitContext<'a> {
    pub fn new(
        identifier: &'a str,
        properties: &'a PropertyCollection,
        registry: &'a ConverterRegistry,
    ) -> Self {
        Self {
            identifier,
            properties,
            registry,
        }
    }
}

property_getters!(InitContext<'_>);

/// Context passed to `process`.
///
/// Inputs are snapshots of the data held by connected outports, taken before
/// the processor runs. Outputs are staged here and published by the network
/// once `process` succeeds.
pub struct ProcessContext<'a> {
    identifier: &'a str,
    ports: &'a [PortDescriptor],
    inputs: &'a [Vec<PortData>],
    changed: &'a [bool],
    outputs: Vec<Option<PortData>>,
    properties: &'a PropertyCollection,
    registry: &'a ConverterRegistry,
}

impl<'a> ProcessContext<'a> {
    /// `inputs` and `changed` are indexed like `ports`; entries for outports
    /// are ignored.
    pub fn new(
        identifier: &'a str,
        ports: &'a [PortDescriptor],
        inputs: &'a [Vec<PortData>],
        changed: &'a [bool],
        properties: &'a PropertyCollection,
        registry: &'a ConverterRegistry,
    ) -> Self {
        Self {
            identifier,
            ports,
            inputs,
            changed,
            outputs: vec![None; ports.len()],
            properties,
            registry,
        }
    }

    fn port_index(&self, name: &str, direction: PortDirection) -> ProcessorResult<usize> {
        self.ports
            .iter()
            .position(|p| p.identifier == name && p.direction == direction)
            .ok_or_else(|| ProcessorError::UnknownPort(name.to_string()))
    }

    /// All data objects on an inport, in connection order.
    pub fn inputs(&self, name: &str) -> ProcessorResult<&[PortData]> {
        let index = self.port_index(name, PortDirection::Input)?;
        Ok(self.inputs.get(index).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// First data object on an inport.
    pub fn input(&self, name: &str) -> ProcessorResult<&PortData> {
        self.inputs(name)?
            .first()
            .ok_or_else(|| ProcessorError::MissingInput(name.to_string()))
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs(name).is_ok_and(|inputs| !inputs.is_empty())
    }

    /// First data object on an inport, as a plain data container.
    pub fn input_data(&self, name: &str) -> ProcessorResult<&DataRef> {
        let index = self.port_index(name, PortDirection::Input)?;
        let data = self.input(name)?;
        data.as_data().ok_or_else(|| ProcessorError::PortType {
            port: name.to_string(),
            expected: self.ports[index].port_type,
            found: data.port_type(),
        })
    }

    pub fn is_changed(&self, name: &str) -> bool {
        self.port_index(name, PortDirection::Input)
            .ok()
            .and_then(|i| self.changed.get(i).copied())
            .unwrap_or(false)
    }

    /// Stage data for an outport.
    pub fn set_output(&mut self, name: &str, data: impl Into<PortData>) -> ProcessorResult<()> {
        let index = self.port_index(name, PortDirection::Output)?;
        let data = data.into();
        let expected = self.ports[index].port_type;
        if data.port_type() != expected {
            return Err(ProcessorError::PortType {
                port: name.to_string(),
                expected,
                found: data.port_type(),
            });
        }
        self.outputs[index] = Some(data);
        Ok(())
    }

    pub fn output(&self, name: &str) -> Option<&PortData> {
        let index = self.port_index(name, PortDirection::Output).ok()?;
        self.outputs[index].as_ref()
    }

    pub(crate) fn into_outputs(self) -> Vec<Option<PortData>> {
        self.outputs
    }
}

property_getters!(ProcessContext<'_>);

/// Trait implemented by every processor.
pub trait Processor: Send {
    fn info(&self) -> ProcessorInfo;

    /// Port descriptors, in declaration order.
    fn ports(&self) -> &[PortDescriptor];

    /// Declared properties with their default values.
    fn properties(&self) -> Vec<Property> {
        Vec::new()
    }

    /// Sources are scheduled ahead of other roots.
    fn is_source(&self) -> bool {
        !self.ports().iter().any(PortDescriptor::is_input)
    }

    /// Called once, when the processor joins a network.
    fn initialize(&mut self, _ctx: &InitContext) -> ProcessorResult<()> {
        Ok(())
    }

    /// Rebuild expensive resources after an `InvalidResources` change.
    fn initialize_resources(&mut self, _ctx: &InitContext) -> ProcessorResult<()> {
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()>;

    /// Called before the processor is dropped. Must tolerate a failed
    /// `initialize`.
    fn deinitialize(&mut self) {}

    fn on_property_change(&mut self, _property: &Property) {}
}

/// Enum dispatch for built-in processors.
pub enum BuiltinProcessor {
    BufferSource(BufferSource),
    BufferScale(BufferScale),
    BufferConcat(BufferConcat),
    BufferStatistics(BufferStatistics),
    MeshAssembler(MeshAssembler),
    ImageSource(ImageSource),
}

macro_rules! builtin_dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            BuiltinProcessor::BufferSource($p) => $body,
            BuiltinProcessor::BufferScale($p) => $body,
            BuiltinProcessor::BufferConcat($p) => $body,
            BuiltinProcessor::BufferStatistics($p) => $body,
            BuiltinProcessor::MeshAssembler($p) => $body,
            BuiltinProcessor::ImageSource($p) => $body,
        }
    };
}

impl BuiltinProcessor {
    pub fn info(&self) -> ProcessorInfo {
        builtin_dispatch!(self, p => p.info())
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        builtin_dispatch!(self, p => p.ports())
    }

    pub fn properties(&self) -> Vec<Property> {
        builtin_dispatch!(self, p => p.properties())
    }

    pub fn is_source(&self) -> bool {
        builtin_dispatch!(self, p => p.is_source())
    }

    pub fn initialize(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        builtin_dispatch!(self, p => p.initialize(ctx))
    }

    pub fn initialize_resources(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        builtin_dispatch!(self, p => p.initialize_resources(ctx))
    }

    pub fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        builtin_dispatch!(self, p => p.process(ctx))
    }

    pub fn deinitialize(&mut self) {
        builtin_dispatch!(self, p => p.deinitialize())
    }

    pub fn on_property_change(&mut self, property: &Property) {
        builtin_dispatch!(self, p => p.on_property_change(property))
    }
}

/// Wrapper that holds either a built-in processor (enum dispatch) or a plugin
/// (trait object).
pub enum AnyProcessor {
    Builtin(BuiltinProcessor),
    Plugin(Box<dyn Processor>),
}

impl AnyProcessor {
    pub fn plugin(processor: impl Processor + 'static) -> Self {
        AnyProcessor::Plugin(Box::new(processor))
    }

    pub fn as_builtin(&self) -> Option<&BuiltinProcessor> {
        match self {
            AnyProcessor::Builtin(p) => Some(p),
            AnyProcessor::Plugin(_) => None,
        }
    }

    pub fn info(&self) -> ProcessorInfo {
        match self {
            AnyProcessor::Builtin(p) => p.info(),
            AnyProcessor::Plugin(p) => p.info(),
        }
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        match self {
            AnyProcessor::Builtin(p) => p.ports(),
            AnyProcessor::Plugin(p) => p.ports(),
        }
    }

    pub fn properties(&self) -> Vec<Property> {
        match self {
            AnyProcessor::Builtin(p) => p.properties(),
            AnyProcessor::Plugin(p) => p.properties(),
        }
    }

    pub fn is_source(&self) -> bool {
        match self {
            AnyProcessor::Builtin(p) => p.is_source(),
            AnyProcessor::Plugin(p) => p.is_source(),
        }
    }

    pub fn initialize(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        match self {
            AnyProcessor::Builtin(p) => p.initialize(ctx),
            AnyProcessor::Plugin(p) => p.initialize(ctx),
        }
    }

    pub fn initialize_resources(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        match self {
            AnyProcessor::Builtin(p) => p.initialize_resources(ctx),
            AnyProcessor::Plugin(p) => p.initialize_resources(ctx),
        }
    }

    pub fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        match self {
            AnyProcessor::Builtin(p) => p.process(ctx),
            AnyProcessor::Plugin(p) => p.process(ctx),
        }
    }

    pub fn deinitialize(&mut self) {
        match self {
            AnyProcessor::Builtin(p) => p.deinitialize(),
            AnyProcessor::Plugin(p) => p.deinitialize(),
        }
    }

    pub fn on_property_change(&mut self, property: &Property) {
        match self {
            AnyProcessor::Builtin(p) => p.on_property_change(property),
            AnyProcessor::Plugin(p) => p.on_property_change(property),
        }
    }
}

impl From<BuiltinProcessor> for AnyProcessor {
    fn from(p: BuiltinProcessor) -> Self {
        AnyProcessor::Builtin(p)
    }
}

impl From<Box<dyn Processor>> for AnyProcessor {
    fn from(p: Box<dyn Processor>) -> Self {
        AnyProcessor::Plugin(p)
    }
}

macro_rules! builtin_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for AnyProcessor {
                fn from(p: $variant) -> Self {
                    AnyProcessor::Builtin(BuiltinProcessor::$variant(p))
                }
            }
        )*
    };
}

builtin_from!(
    BufferSource,
    BufferScale,
    BufferConcat,
    BufferStatistics,
    MeshAssembler,
    ImageSource,
);

impl fmt::Debug for AnyProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            AnyProcessor::Builtin(_) => "Builtin",
            AnyProcessor::Plugin(_) => "Plugin",
        };
        write!(f, "AnyProcessor::{}({})", kind, self.info().class_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::data::{BufferType, Data};
    use crate::datastructures::format::DataFormat;
    use crate::datastructures::representation::RamStorage;
    use crate::network::port::PortType;

    const PORTS: [PortDescriptor; 2] = [
        PortDescriptor::input("in", PortType::Buffer),
        PortDescriptor::output("out", PortType::Buffer),
    ];

    fn buffer() -> PortData {
        Data::buffer(
            BufferType::Position,
            DataFormat::FLOAT32,
            RamStorage::Float32(vec![1.0]),
        )
        .map(DataRef::new)
        .map(PortData::Data)
        .unwrap()
    }

    #[test]
    fn test_context_input_access() {
        let registry = ConverterRegistry::new();
        let properties = PropertyCollection::new();
        let inputs = vec![vec![buffer()], Vec::new()];
        let changed = [true, false];
        let ctx = ProcessContext::new("p", &PORTS, &inputs, &changed, &properties, &registry);
        assert!(ctx.has_input("in"));
        assert!(ctx.is_changed("in"));
        assert!(ctx.input_data("in").is_ok());
        assert!(matches!(ctx.input("out"), Err(ProcessorError::UnknownPort(_))));
    }

    #[test]
    fn test_context_output_type_checked() {
        let registry = ConverterRegistry::new();
        let properties = PropertyCollection::new();
        let inputs = vec![Vec::new(), Vec::new()];
        let changed = [false, false];
        let mut ctx = ProcessContext::new("p", &PORTS, &inputs, &changed, &properties, &registry);
        assert!(matches!(ctx.input("in"), Err(ProcessorError::MissingInput(_))));
        let err = ctx
            .set_output("out", crate::datastructures::mesh::Mesh::default())
            .unwrap_err();
        assert!(matches!(err, ProcessorError::PortType { .. }));
        ctx.set_output("out", buffer()).unwrap();
        assert!(ctx.output("out").is_some());
        let outputs = ctx.into_outputs();
        assert!(outputs[0].is_none());
        assert!(outputs[1].is_some());
    }

    #[test]
    fn test_typed_property_getters() {
        let registry = ConverterRegistry::new();
        let properties: PropertyCollection =
            [Property::new("factor", "Factor", PropertyValue::Float(2.5))]
                .into_iter()
                .collect();
        let ctx = InitContext::new("p", &properties, &registry);
        assert_eq!(ctx.float("factor").unwrap(), 2.5);
        assert!(matches!(
            ctx.int("factor"),
            Err(ProcessorError::PropertyType { .. })
        ));
        assert!(matches!(
            ctx.float("missing"),
            Err(ProcessorError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_metadata_defaults_visible() {
        let meta: ProcessorMetaData = serde_json::from_str("{}").unwrap();
        assert!(meta.visible);
        assert_eq!(meta.position, [0, 0]);
    }
}
