use crate::context::{ApplicationContext, Module};
use crate::datastructures::converter::RepresentationConverter;
use crate::datastructures::data::{
    BufferType, Data, DataClass, DataDescriptor, DataRef, LayerType,
};
use crate::datastructures::error::{DataError, DataResult};
use crate::datastructures::representation::{Representation, RepresentationKind};
use crate::network::processors::{
    BufferConcat, BufferScale, BufferSource, BufferStatistics, ImageSource, MeshAssembler,
};

/// Built-in processors, the data classes and disk loading.
#[derive(Debug, Default)]
pub struct BaseModule;

/// Reads a raw file into host memory. Disk sources are read-only, so there is
/// no converter in the other direction.
struct DiskToRam;

impl RepresentationConverter for DiskToRam {
    fn create_from(
        &self,
        source: &Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<Representation> {
        let disk = source
            .as_disk()
            .ok_or(DataError::UnexpectedRepresentation {
                expected: RepresentationKind::Disk,
                found: source.kind(),
            })?;
        let storage = disk.read(descriptor.format.element)?;
        if storage.len() != descriptor.scalar_count() {
            return Err(DataError::SizeMismatch {
                expected: descriptor.scalar_count(),
                actual: storage.len(),
            });
        }
        Ok(Representation::ram(storage))
    }
}

impl Module for BaseModule {
    fn identifier(&self) -> &'static str {
        "org.visnet.base"
    }

    fn register(&self, context: &mut ApplicationContext) {
        let processors = context.processors_mut();
        processors.register(BufferSource::INFO, || BufferSource.into());
        processors.register(BufferScale::INFO, || BufferScale::default().into());
        processors.register(BufferConcat::INFO, || BufferConcat.into());
        processors.register(BufferStatistics::INFO, || BufferStatistics::default().into());
        processors.register(MeshAssembler::INFO, || MeshAssembler.into());
        processors.register(ImageSource::INFO, || ImageSource.into());

        let data = context.data_factory_mut();
        data.register(DataClass::BUFFER_ID, |format, dimensions| {
            Data::new(DataDescriptor::new(
                DataClass::buffer(BufferType::Position),
                format,
                dimensions,
            ))
        });
        data.register(DataClass::LAYER_ID, |format, dimensions| {
            Data::new(DataDescriptor::new(
                DataClass::Layer {
                    layer_type: LayerType::Color,
                },
                format,
                dimensions,
            ))
        });
        data.register(DataClass::VOLUME_ID, |format, dimensions| {
            Data::new(DataDescriptor::new(DataClass::Volume, format, dimensions))
        });

        context.converters_mut().register_converter(
            RepresentationKind::Disk,
            RepresentationKind::Ram,
            DiskToRam,
        );
    }
}

/// Shorthand for a shared data object created through the context's factory.
pub fn create_data(
    context: &ApplicationContext,
    class_identifier: &str,
    format: crate::datastructures::format::DataFormat,
    dimensions: [usize; 3],
) -> DataResult<DataRef> {
    context
        .data_factory()
        .create(class_identifier, format, dimensions)
        .map(DataRef::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::format::{DataFormat, ElementType};
    use std::io::Write;

    #[test]
    fn test_disk_volume_loads_on_ram_request() {
        let mut context = ApplicationContext::new("test");
        context.register_module(&BaseModule);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let values: [f32; 8] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        file.write_all(bytemuck::cast_slice(&values)).unwrap();

        let descriptor = DataDescriptor::new(DataClass::Volume, DataFormat::FLOAT32, [2, 2, 2]);
        let mut volume = Data::from_disk(descriptor, file.path());
        let rep = volume
            .get_representation(RepresentationKind::Ram, context.converters())
            .unwrap();
        assert_eq!(rep.as_ram().unwrap().as_f32().unwrap(), &values);
    }

    #[test]
    fn test_disk_size_mismatch_reported() {
        let mut context = ApplicationContext::new("test");
        context.register_module(&BaseModule);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 12]).unwrap();
        let descriptor = DataDescriptor::new(DataClass::Volume, DataFormat::FLOAT32, [2, 2, 2]);
        let mut volume = Data::from_disk(descriptor, file.path());
        assert!(matches!(
            volume.get_representation(RepresentationKind::Ram, context.converters()),
            Err(DataError::SizeMismatch { expected: 8, actual: 3 })
        ));
    }

    #[test]
    fn test_factory_creates_zeroed_volume() {
        let mut context = ApplicationContext::new("test");
        context.register_module(&BaseModule);
        let volume = create_data(
            &context,
            DataClass::VOLUME_ID,
            DataFormat::new(ElementType::UInt8, 1),
            [4, 4, 4],
        )
        .unwrap();
        let mut data = volume.lock();
        assert_eq!(data.class(), DataClass::Volume);
        let rep = data
            .get_representation(RepresentationKind::Ram, context.converters())
            .unwrap();
        assert_eq!(rep.size_in_bytes(), 64);
    }
}
