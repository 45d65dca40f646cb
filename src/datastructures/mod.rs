//! Data containers and their backend representations.

pub mod converter;
pub mod data;
pub mod error;
pub mod format;
pub mod image;
pub mod mesh;
pub mod representation;
pub mod sync;

pub use converter::{ConversionPath, ConverterRegistry, FnConverter, RepresentationConverter};
pub use data::{
    BufferType, BufferUsage, Data, DataClass, DataDescriptor, DataFactory, DataRef, LayerType,
};
pub use error::{DataError, DataResult};
pub use format::{DataFormat, ElementType};
pub use image::Image;
pub use mesh::{DrawType, Mesh};
pub use representation::{
    DeviceStorage, DiskSource, RamStorage, Representation, RepresentationKind,
    RepresentationMut, RepresentationPayload,
};
pub use sync::SharedResources;
