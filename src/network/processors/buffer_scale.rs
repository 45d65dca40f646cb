use crate::datastructures::representation::RepresentationKind;
use crate::datastructures::sync::SharedResources;
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::port::{PortDescriptor, PortType};
use crate::network::processor::{CodeState, InitContext, ProcessContext, Processor, ProcessorInfo};
use crate::network::property::{InvalidationLevel, Property, PropertyValue};

const PORTS: [PortDescriptor; 2] = [
    PortDescriptor::input("inport", PortType::Buffer),
    PortDescriptor::output("outport", PortType::Buffer),
];

/// Where the scale kernel runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKernel {
    Ram,
    /// Runs on the CL representation of the output buffer.
    Device,
}

/// Multiplies every scalar of a FLOAT32 buffer by `factor`.
///
/// Switching `backend` rebuilds the kernel (`InvalidResources`).
#[derive(Debug, Default)]
pub struct BufferScale {
    kernel: Option<ScaleKernel>,
    kernel_builds: u32,
}

impl BufferScale {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "org.visnet.BufferScale",
        display_name: "Buffer Scale",
        category: "Data Operation",
        code_state: CodeState::Stable,
        tags: &["CPU", "CL"],
    };

    pub fn kernel(&self) -> Option<ScaleKernel> {
        self.kernel
    }

    /// How often the kernel has been (re)built.
    pub fn kernel_builds(&self) -> u32 {
        self.kernel_builds
    }

    fn build_kernel(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        let kernel = match ctx.text("backend")? {
            "ram" => ScaleKernel::Ram,
            "device" => ScaleKernel::Device,
            other => {
                return Err(ProcessorError::ResourceAcquisitionFailed(format!(
                    "no kernel for backend {other}"
                )))
            }
        };
        tracing::debug!("{}: built {:?} scale kernel", ctx.identifier(), kernel);
        self.kernel = Some(kernel);
        self.kernel_builds += 1;
        Ok(())
    }
}

impl Processor for BufferScale {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &PORTS
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new("factor", "Factor", PropertyValue::Float(1.0)),
            Property::new(
                "backend",
                "Backend",
                PropertyValue::Option("ram".to_string()),
            )
            .with_options(["ram", "device"])
            .with_invalidation(InvalidationLevel::InvalidResources),
        ]
    }

    fn initialize(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        self.build_kernel(ctx)
    }

    fn initialize_resources(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        self.build_kernel(ctx)
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        let kernel = self.kernel.ok_or_else(|| {
            ProcessorError::ResourceAcquisitionFailed("scale kernel not built".to_string())
        })?;
        let factor = ctx.float("factor")? as f32;
        let output = ctx.input_data("inport")?.deep_clone();

        match kernel {
            ScaleKernel::Ram => {
                let mut data = output.lock();
                let mut rep =
                    data.get_editable_representation(RepresentationKind::Ram, ctx.registry())?;
                let values = rep
                    .as_f32_mut()
                    .ok_or_else(|| ProcessorError::processing("input is not FLOAT32"))?;
                values.iter_mut().for_each(|v| *v *= factor);
            }
            ScaleKernel::Device => {
                let resources = [output.clone()];
                let mut shared = SharedResources::acquire(&resources);
                let data = shared.get_mut(0).ok_or_else(|| {
                    ProcessorError::ResourceAcquisitionFailed("output buffer".to_string())
                })?;
                let mut rep = data
                    .get_editable_representation(RepresentationKind::Cl, ctx.registry())
                    .map_err(|e| ProcessorError::ResourceAcquisitionFailed(e.to_string()))?;
                rep.modify_f32(|values| values.iter_mut().for_each(|v| *v *= factor))?;
            }
        }

        ctx.set_output("outport", output)
    }

    fn deinitialize(&mut self) {
        self.kernel = None;
    }
}
