//! Host-simulated device backends.
//!
//! `Gl` and `Cl` stand for buffer/texture objects of a graphics and a compute
//! API; `ClGl` is a compute view of a graphics object. Device allocations are
//! plain byte vectors tagged with a backend and a handle.

use crate::context::{ApplicationContext, Module};
use crate::datastructures::converter::{ConverterRegistry, RepresentationConverter};
use crate::datastructures::data::DataDescriptor;
use crate::datastructures::error::DataResult;
use crate::datastructures::representation::{
    DeviceStorage, Representation, RepresentationKind,
};

/// Uploads and downloads cost more than switching between interop views.
const TRANSFER_COST: u32 = 2;
const INTEROP_COST: u32 = 1;

#[derive(Debug, Default)]
pub struct DeviceModule;

/// Host to device upload.
struct Upload {
    backend: RepresentationKind,
}

impl RepresentationConverter for Upload {
    fn create_from(
        &self,
        source: &Representation,
        _descriptor: &DataDescriptor,
    ) -> DataResult<Representation> {
        let ram = source.expect_ram()?;
        Ok(Representation::device(DeviceStorage::from_bytes(
            self.backend,
            ram.element_type(),
            ram.as_bytes(),
        )))
    }

    fn update(
        &self,
        source: &Representation,
        destination: &mut Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<()> {
        let ram = source.expect_ram()?;
        match destination.as_device_mut() {
            Some(device) if device.backend() == self.backend => {
                device.upload(ram.element_type(), ram.as_bytes());
                Ok(())
            }
            _ => {
                *destination = self.create_from(source, descriptor)?;
                Ok(())
            }
        }
    }

    fn cost(&self) -> u32 {
        TRANSFER_COST
    }
}

/// Device to host download.
struct Download {
    backend: RepresentationKind,
}

impl RepresentationConverter for Download {
    fn create_from(
        &self,
        source: &Representation,
        _descriptor: &DataDescriptor,
    ) -> DataResult<Representation> {
        Ok(Representation::ram(
            source.expect_device(self.backend)?.download()?,
        ))
    }

    fn update(
        &self,
        source: &Representation,
        destination: &mut Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<()> {
        let device = source.expect_device(self.backend)?;
        match destination.as_ram_mut() {
            Some(ram) => ram.copy_from_bytes(device.element(), device.bytes()),
            None => {
                *destination = self.create_from(source, descriptor)?;
                Ok(())
            }
        }
    }

    fn cost(&self) -> u32 {
        TRANSFER_COST
    }
}

/// View of a device allocation for another backend. Keeps the handle.
struct Interop {
    source: RepresentationKind,
    backend: RepresentationKind,
}

impl RepresentationConverter for Interop {
    fn create_from(
        &self,
        source: &Representation,
        _descriptor: &DataDescriptor,
    ) -> DataResult<Representation> {
        Ok(Representation::device(
            source.expect_device(self.source)?.share(self.backend),
        ))
    }

    fn update(
        &self,
        source: &Representation,
        destination: &mut Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<()> {
        let shared = source.expect_device(self.source)?;
        match destination.as_device_mut() {
            Some(view) if view.handle() == shared.handle() => {
                view.upload(shared.element(), shared.bytes());
                Ok(())
            }
            _ => {
                *destination = self.create_from(source, descriptor)?;
                Ok(())
            }
        }
    }

    fn cost(&self) -> u32 {
        INTEROP_COST
    }
}

/// Register the device converters into `registry`.
pub fn register_device_converters(registry: &mut ConverterRegistry) {
    use RepresentationKind::{Cl, ClGl, Gl, Ram};

    registry.register_converter(Ram, Gl, Upload { backend: Gl });
    registry.register_converter(Gl, Ram, Download { backend: Gl });
    registry.register_converter(Ram, Cl, Upload { backend: Cl });
    registry.register_converter(Cl, Ram, Download { backend: Cl });
    registry.register_converter(
        Gl,
        ClGl,
        Interop {
            source: Gl,
            backend: ClGl,
        },
    );
    registry.register_converter(
        ClGl,
        Gl,
        Interop {
            source: ClGl,
            backend: Gl,
        },
    );
}

impl Module for DeviceModule {
    fn identifier(&self) -> &'static str {
        "org.visnet.device"
    }

    fn register(&self, context: &mut ApplicationContext) {
        register_device_converters(context.converters_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::data::{BufferType, Data};
    use crate::datastructures::format::DataFormat;
    use crate::datastructures::representation::RamStorage;

    fn registry() -> ConverterRegistry {
        let mut registry = ConverterRegistry::new();
        register_device_converters(&mut registry);
        registry
    }

    fn buffer(values: &[f32]) -> Data {
        Data::buffer(
            BufferType::Position,
            DataFormat::FLOAT32,
            RamStorage::Float32(values.to_vec()),
        )
        .unwrap()
    }

    #[test]
    fn test_interop_shares_handle() {
        let registry = registry();
        let mut data = buffer(&[1.0, 2.0]);
        let gl = data
            .get_representation(RepresentationKind::Gl, &registry)
            .unwrap()
            .expect_device(RepresentationKind::Gl)
            .unwrap()
            .handle();
        let clgl = data
            .get_representation(RepresentationKind::ClGl, &registry)
            .unwrap()
            .expect_device(RepresentationKind::ClGl)
            .unwrap()
            .handle();
        assert_eq!(gl, clgl);
    }

    #[test]
    fn test_gl_to_cl_goes_through_host() {
        let registry = registry();
        let path = registry
            .find_path(RepresentationKind::Gl, RepresentationKind::Cl)
            .unwrap();
        assert_eq!(
            path.steps,
            vec![
                (RepresentationKind::Gl, RepresentationKind::Ram),
                (RepresentationKind::Ram, RepresentationKind::Cl),
            ]
        );
        assert_eq!(path.cost, 2 * TRANSFER_COST);
    }

    #[test]
    fn test_stale_upload_reuses_allocation() {
        let registry = registry();
        let mut data = buffer(&[1.0, 2.0, 3.0]);
        let handle = data
            .get_representation(RepresentationKind::Gl, &registry)
            .unwrap()
            .expect_device(RepresentationKind::Gl)
            .unwrap()
            .handle();

        let mut ram = data
            .get_editable_representation(RepresentationKind::Ram, &registry)
            .unwrap();
        ram.as_f32_mut().unwrap()[0] = 10.0;

        let gl = data
            .get_representation(RepresentationKind::Gl, &registry)
            .unwrap()
            .expect_device(RepresentationKind::Gl)
            .unwrap();
        assert_eq!(gl.handle(), handle);
        assert_eq!(gl.download().unwrap(), RamStorage::Float32(vec![10.0, 2.0, 3.0]));
    }
}
