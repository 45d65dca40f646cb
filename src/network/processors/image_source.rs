use crate::datastructures::format::DataFormat;
use crate::datastructures::image::Image;
use crate::datastructures::representation::RepresentationKind;
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::port::{PortDescriptor, PortType};
use crate::network::processor::{CodeState, ProcessContext, Processor, ProcessorInfo};
use crate::network::property::{Property, PropertyValue};

const PORTS: [PortDescriptor; 1] = [PortDescriptor::output("image", PortType::Image)];

/// Publishes an image whose color layer is filled with a constant color.
#[derive(Debug, Default)]
pub struct ImageSource;

impl ImageSource {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "org.visnet.ImageSource",
        display_name: "Image Source",
        category: "Data Input",
        code_state: CodeState::Stable,
        tags: &["CPU"],
    };
}

impl Processor for ImageSource {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &PORTS
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new("dimensions", "Dimensions", PropertyValue::IVec2([64, 64]))
                .with_range(1.0, 4096.0),
            Property::new("color", "Color", PropertyValue::Vec3([0.5, 0.5, 0.5]))
                .with_range(0.0, 1.0),
        ]
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        let [w, h] = ctx.ivec2("dimensions")?;
        let [r, g, b] = ctx.vec3("color")?;
        let image = Image::new([w as usize, h as usize], DataFormat::VEC4_FLOAT32);

        let layer = image
            .color_layer(0)
            .ok_or_else(|| ProcessorError::processing("image has no color layer"))?;
        {
            let mut data = layer.lock();
            let mut rep =
                data.get_editable_representation(RepresentationKind::Ram, ctx.registry())?;
            let texels = rep
                .as_f32_mut()
                .ok_or_else(|| ProcessorError::processing("color layer is not FLOAT32"))?;
            let rgba = [r as f32, g as f32, b as f32, 1.0];
            for texel in texels.chunks_exact_mut(4) {
                texel.copy_from_slice(&rgba);
            }
        }
        ctx.set_output("image", image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::converter::ConverterRegistry;
    use crate::network::processors::test_support::default_properties;

    #[test]
    fn test_fills_color_layer() {
        let registry = ConverterRegistry::new();
        let mut properties = default_properties(&ImageSource);
        properties
            .get_mut("dimensions")
            .unwrap()
            .set(PropertyValue::IVec2([2, 3]))
            .unwrap();
        let mut ctx = ProcessContext::new("img", &PORTS, &[], &[], &properties, &registry);
        ImageSource.process(&mut ctx).unwrap();
        let image = ctx.output("image").unwrap().as_image().unwrap().clone();
        assert_eq!(image.dimensions(), [2, 3]);
        let mut layer = image.color_layer(0).unwrap().lock();
        let rep = layer
            .get_representation(RepresentationKind::Ram, &registry)
            .unwrap();
        let texels = rep.as_ram().unwrap().as_f32().unwrap();
        assert_eq!(texels.len(), 24);
        assert_eq!(&texels[..4], &[0.5, 0.5, 0.5, 1.0]);
    }
}
