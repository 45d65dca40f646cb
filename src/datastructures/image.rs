//! Image aggregate: color layers plus optional depth and picking layers.

use crate::datastructures::converter::ConverterRegistry;
use crate::datastructures::data::{Data, DataClass, DataDescriptor, DataRef, LayerType};
use crate::datastructures::error::{DataError, DataResult};
use crate::datastructures::format::DataFormat;
use crate::datastructures::representation::RepresentationKind;

/// Create an empty layer of the given type and size.
pub fn layer(layer_type: LayerType, format: DataFormat, dimensions: [usize; 2]) -> Data {
    Data::new(DataDescriptor::new(
        DataClass::Layer { layer_type },
        format,
        [dimensions[0], dimensions[1], 1],
    ))
}

#[derive(Debug, Clone)]
pub struct Image {
    dimensions: [usize; 2],
    color_layers: Vec<DataRef>,
    depth: Option<DataRef>,
    picking: Option<DataRef>,
}

impl Image {
    /// Image with one color layer of `format`, a FLOAT32 depth layer and a
    /// picking layer.
    pub fn new(dimensions: [usize; 2], format: DataFormat) -> Self {
        Self {
            dimensions,
            color_layers: vec![layer(LayerType::Color, format, dimensions).into()],
            depth: Some(layer(LayerType::Depth, DataFormat::FLOAT32, dimensions).into()),
            picking: Some(layer(LayerType::Picking, DataFormat::VEC4_UINT8, dimensions).into()),
        }
    }

    /// Image made of color layers only.
    pub fn from_color_layers(dimensions: [usize; 2], layers: Vec<DataRef>) -> DataResult<Self> {
        let mut image = Self {
            dimensions,
            color_layers: Vec::with_capacity(layers.len()),
            depth: None,
            picking: None,
        };
        for layer in layers {
            image.add_color_layer(layer)?;
        }
        Ok(image)
    }

    pub fn dimensions(&self) -> [usize; 2] {
        self.dimensions
    }

    pub fn add_color_layer(&mut self, layer: DataRef) -> DataResult<()> {
        let descriptor = layer.descriptor();
        self.check_layer(&descriptor, LayerType::Color)?;
        self.color_layers.push(layer);
        Ok(())
    }

    fn check_layer(&self, descriptor: &DataDescriptor, expected: LayerType) -> DataResult<()> {
        match descriptor.class {
            DataClass::Layer { layer_type } if layer_type == expected => {}
            other => {
                return Err(DataError::FormatMismatch(format!(
                    "expected a {:?} layer, got {:?}",
                    expected, other
                )))
            }
        }
        let [w, h, _] = descriptor.dimensions;
        if [w, h] != self.dimensions {
            return Err(DataError::SizeMismatch {
                expected: self.dimensions[0] * self.dimensions[1],
                actual: w * h,
            });
        }
        Ok(())
    }

    pub fn color_layer(&self, index: usize) -> Option<&DataRef> {
        self.color_layers.get(index)
    }

    pub fn color_layers(&self) -> &[DataRef] {
        &self.color_layers
    }

    pub fn depth_layer(&self) -> Option<&DataRef> {
        self.depth.as_ref()
    }

    pub fn picking_layer(&self) -> Option<&DataRef> {
        self.picking.as_ref()
    }

    pub fn layers(&self) -> impl Iterator<Item = &DataRef> {
        self.color_layers
            .iter()
            .chain(self.depth.iter())
            .chain(self.picking.iter())
    }

    /// Resize every layer. Layer contents become stale.
    pub fn resize(&mut self, dimensions: [usize; 2]) {
        self.dimensions = dimensions;
        for layer in self.layers() {
            layer.lock().resize([dimensions[0], dimensions[1], 1]);
        }
    }

    pub fn ensure_representation(
        &self,
        kind: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<()> {
        for layer in self.layers() {
            layer.lock().get_representation(kind, registry)?;
        }
        Ok(())
    }

    pub fn clone_deep(&self) -> Self {
        Self {
            dimensions: self.dimensions,
            color_layers: self.color_layers.iter().map(DataRef::deep_clone).collect(),
            depth: self.depth.as_ref().map(DataRef::deep_clone),
            picking: self.picking.as_ref().map(DataRef::deep_clone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_has_all_layers() {
        let image = Image::new([4, 2], DataFormat::VEC4_UINT8);
        assert_eq!(image.layers().count(), 3);
        assert_eq!(image.depth_layer().unwrap().descriptor().element_count(), 8);
    }

    #[test]
    fn test_resize_applies_to_layers() {
        let mut image = Image::new([4, 2], DataFormat::VEC4_UINT8);
        image.resize([8, 8]);
        for layer in image.layers() {
            assert_eq!(layer.descriptor().dimensions, [8, 8, 1]);
        }
    }

    #[test]
    fn test_color_layer_size_checked() {
        let mut image = Image::new([4, 2], DataFormat::VEC4_UINT8);
        let wrong = layer(LayerType::Color, DataFormat::VEC4_UINT8, [3, 3]);
        assert!(image.add_color_layer(wrong.into()).is_err());
        let depth = layer(LayerType::Depth, DataFormat::FLOAT32, [4, 2]);
        assert!(image.add_color_layer(depth.into()).is_err());
    }

    #[test]
    fn test_ram_access_creates_default_layers() {
        let image = Image::new([2, 2], DataFormat::FLOAT32);
        image
            .ensure_representation(RepresentationKind::Ram, &ConverterRegistry::new())
            .unwrap();
        let color = image.color_layer(0).unwrap().lock();
        assert_eq!(color.authoritative_kind(), Some(RepresentationKind::Ram));
    }
}
