use crate::datastructures::data::{Data, DataRef};
use crate::datastructures::format::{DataFormat, ElementType};
use crate::datastructures::representation::RamStorage;
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::port::{PortDescriptor, PortType};
use crate::network::processor::{CodeState, ProcessContext, Processor, ProcessorInfo};
use crate::network::processors::{buffer_type_from_key, BUFFER_TYPE_OPTIONS};
use crate::network::property::{Property, PropertyValue};

const PORTS: [PortDescriptor; 1] = [PortDescriptor::output("outport", PortType::Buffer)];

/// Publishes a FLOAT32 buffer built from its `values` property.
#[derive(Debug, Default)]
pub struct BufferSource;

impl BufferSource {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "org.visnet.BufferSource",
        display_name: "Buffer Source",
        category: "Data Input",
        code_state: CodeState::Stable,
        tags: &["CPU"],
    };
}

impl Processor for BufferSource {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &PORTS
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new(
                "values",
                "Values",
                PropertyValue::FloatList(vec![1.0, 2.0, 3.0]),
            ),
            Property::new("channels", "Channels", PropertyValue::Int(1)).with_range(1.0, 4.0),
            Property::new(
                "buffer_type",
                "Buffer Type",
                PropertyValue::Option("position".to_string()),
            )
            .with_options(BUFFER_TYPE_OPTIONS),
        ]
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        let values = ctx.float_list("values")?;
        let channels = ctx.int("channels")? as u8;
        if values.len() % channels as usize != 0 {
            return Err(ProcessorError::processing(format!(
                "{} values do not split into {}-channel elements",
                values.len(),
                channels
            )));
        }
        let key = ctx.text("buffer_type")?;
        let buffer_type = buffer_type_from_key(key)
            .ok_or_else(|| ProcessorError::processing(format!("unknown buffer type {key}")))?;

        let storage = RamStorage::from_f64(ElementType::Float32, values);
        let data = Data::buffer(
            buffer_type,
            DataFormat::new(ElementType::Float32, channels),
            storage,
        )?;
        ctx.set_output("outport", DataRef::new(data))
    }
}
