use crate::datastructures::data::BufferType;
use crate::datastructures::mesh::{DrawType, Mesh};
use crate::datastructures::representation::RepresentationKind;
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::port::{PortDescriptor, PortType};
use crate::network::processor::{CodeState, ProcessContext, Processor, ProcessorInfo};
use crate::network::property::{Property, PropertyValue};

const PORTS: [PortDescriptor; 3] = [
    PortDescriptor::input("positions", PortType::Buffer),
    PortDescriptor::input("colors", PortType::Buffer).optional(),
    PortDescriptor::output("mesh", PortType::Mesh),
];

/// Builds a mesh from a position buffer and an optional color buffer.
///
/// The buffers are shared with upstream, not copied. With `upload` set, every
/// member buffer gets a GL representation before the mesh is published.
#[derive(Debug, Default)]
pub struct MeshAssembler;

impl MeshAssembler {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "org.visnet.MeshAssembler",
        display_name: "Mesh Assembler",
        category: "Mesh Creation",
        code_state: CodeState::Experimental,
        tags: &["CPU", "GL"],
    };
}

fn draw_type_from_key(key: &str) -> Option<DrawType> {
    match key {
        "points" => Some(DrawType::Points),
        "lines" => Some(DrawType::Lines),
        "triangles" => Some(DrawType::Triangles),
        _ => None,
    }
}

impl Processor for MeshAssembler {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &PORTS
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new(
                "draw_type",
                "Draw Type",
                PropertyValue::Option("points".to_string()),
            )
            .with_options(["points", "lines", "triangles"]),
            Property::new("upload", "Upload to GPU", PropertyValue::Bool(false)),
        ]
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        let key = ctx.text("draw_type")?;
        let draw_type = draw_type_from_key(key)
            .ok_or_else(|| ProcessorError::processing(format!("unknown draw type {key}")))?;

        let mut mesh = Mesh::new(draw_type);
        mesh.set_attribute(BufferType::Position, ctx.input_data("positions")?.clone())?;
        if ctx.has_input("colors") {
            let colors = ctx.input_data("colors")?.clone();
            let color_count = colors.descriptor().element_count();
            if color_count != mesh.vertex_count() {
                return Err(ProcessorError::processing(format!(
                    "{} colors for {} vertices",
                    color_count,
                    mesh.vertex_count()
                )));
            }
            mesh.set_attribute(BufferType::Color, colors)?;
        }

        if ctx.bool("upload")? {
            mesh.ensure_representation(RepresentationKind::Gl, ctx.registry())?;
        }
        ctx.set_output("mesh", mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::converter::ConverterRegistry;
    use crate::network::processors::test_support::{default_properties, floats};

    #[test]
    fn test_colors_are_optional() {
        let registry = ConverterRegistry::new();
        let properties = default_properties(&MeshAssembler);
        let inputs = vec![vec![floats(&[0.0, 1.0])], Vec::new(), Vec::new()];
        let changed = [true, false, false];
        let mut ctx =
            ProcessContext::new("mesh", &PORTS, &inputs, &changed, &properties, &registry);
        MeshAssembler.process(&mut ctx).unwrap();
        let mesh = ctx.output("mesh").unwrap().as_mesh().unwrap().clone();
        assert_eq!(mesh.vertex_count(), 2);
        assert_eq!(mesh.draw_type(), DrawType::Points);
    }

    #[test]
    fn test_color_count_must_match() {
        let registry = ConverterRegistry::new();
        let properties = default_properties(&MeshAssembler);
        let inputs = vec![vec![floats(&[0.0, 1.0])], vec![floats(&[1.0])], Vec::new()];
        let changed = [true, true, false];
        let mut ctx =
            ProcessContext::new("mesh", &PORTS, &inputs, &changed, &properties, &registry);
        assert!(matches!(
            MeshAssembler.process(&mut ctx),
            Err(ProcessorError::ProcessingFailed(_))
        ));
    }
}
