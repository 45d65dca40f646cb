use crate::datastructures::data::{Data, DataClass, DataRef};
use crate::datastructures::error::DataError;
use crate::datastructures::representation::{RamStorage, RepresentationKind};
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::port::{PortDescriptor, PortType};
use crate::network::processor::{CodeState, ProcessContext, Processor, ProcessorInfo};

const PORTS: [PortDescriptor; 2] = [
    PortDescriptor::multi_input("inports", PortType::Buffer),
    PortDescriptor::output("outport", PortType::Buffer),
];

/// Joins every connected buffer, in connection order, into one buffer.
#[derive(Debug, Default)]
pub struct BufferConcat;

impl BufferConcat {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "org.visnet.BufferConcat",
        display_name: "Buffer Concatenate",
        category: "Data Operation",
        code_state: CodeState::Experimental,
        tags: &["CPU"],
    };
}

impl Processor for BufferConcat {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        let inputs = ctx.inputs("inports")?;
        let first = inputs
            .first()
            .and_then(|d| d.as_data())
            .ok_or_else(|| ProcessorError::MissingInput("inports".to_string()))?;
        let descriptor = first.descriptor();

        let mut values = Vec::new();
        for input in inputs {
            let buffer = input.as_data().ok_or_else(|| ProcessorError::PortType {
                port: "inports".to_string(),
                expected: PortType::Buffer,
                found: input.port_type(),
            })?;
            let mut data = buffer.lock();
            if data.format() != descriptor.format {
                return Err(DataError::FormatMismatch(format!(
                    "cannot join {} with {}",
                    descriptor.format,
                    data.format()
                ))
                .into());
            }
            let rep = data.get_representation(RepresentationKind::Ram, ctx.registry())?;
            values.extend(rep.expect_ram()?.to_f64_vec());
        }

        let buffer_type = match descriptor.class {
            DataClass::Buffer { buffer_type, .. } => buffer_type,
            other => {
                return Err(ProcessorError::processing(format!(
                    "{other:?} is not a buffer"
                )))
            }
        };
        let storage = RamStorage::from_f64(descriptor.format.element, &values);
        let joined = Data::buffer(buffer_type, descriptor.format, storage)?;
        ctx.set_output("outport", DataRef::new(joined))
    }
}
