//! Mesh aggregate: vertex attribute buffers plus index buffers.

use crate::datastructures::converter::ConverterRegistry;
use crate::datastructures::data::{BufferType, DataClass, DataRef};
use crate::datastructures::error::{DataError, DataResult};
use crate::datastructures::format::ElementType;
use crate::datastructures::representation::RepresentationKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrawType {
    Points,
    Lines,
    #[default]
    Triangles,
}

/// A mesh owns one buffer per attribute role and any number of index buffers.
///
/// Cloning a mesh shares its buffers; use [`Mesh::clone_deep`] for an
/// independent copy.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    draw_type: DrawType,
    attributes: BTreeMap<BufferType, DataRef>,
    index_buffers: Vec<(DrawType, DataRef)>,
}

impl Mesh {
    pub fn new(draw_type: DrawType) -> Self {
        Self {
            draw_type,
            ..Default::default()
        }
    }

    pub fn draw_type(&self) -> DrawType {
        self.draw_type
    }

    /// Attach a vertex attribute. Replaces and returns the buffer previously
    /// attached for the same role.
    pub fn add_attribute(&mut self, buffer: DataRef) -> DataResult<Option<DataRef>> {
        let buffer_type = match buffer.class() {
            DataClass::Buffer { buffer_type, .. } if buffer_type != BufferType::Index => {
                buffer_type
            }
            other => {
                return Err(DataError::FormatMismatch(format!(
                    "{:?} cannot be a mesh attribute",
                    other
                )))
            }
        };
        Ok(self.attributes.insert(buffer_type, buffer))
    }

    /// Attach `buffer` under an explicit role, whatever role the buffer was
    /// created with.
    pub fn set_attribute(
        &mut self,
        buffer_type: BufferType,
        buffer: DataRef,
    ) -> DataResult<Option<DataRef>> {
        if buffer_type == BufferType::Index {
            return Err(DataError::FormatMismatch(
                "index buffers are added with add_index_buffer".to_string(),
            ));
        }
        match buffer.class() {
            DataClass::Buffer { .. } => Ok(self.attributes.insert(buffer_type, buffer)),
            other => Err(DataError::FormatMismatch(format!(
                "{:?} cannot be a mesh attribute",
                other
            ))),
        }
    }

    pub fn attribute(&self, buffer_type: BufferType) -> Option<&DataRef> {
        self.attributes.get(&buffer_type)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (BufferType, &DataRef)> {
        self.attributes.iter().map(|(k, v)| (*k, v))
    }

    pub fn add_index_buffer(&mut self, draw_type: DrawType, indices: DataRef) -> DataResult<()> {
        let descriptor = indices.descriptor();
        if descriptor.format.element != ElementType::UInt32 || descriptor.format.channels != 1 {
            return Err(DataError::FormatMismatch(format!(
                "index buffers must be UINT32, got {}",
                descriptor.format
            )));
        }
        self.index_buffers.push((draw_type, indices));
        Ok(())
    }

    pub fn index_buffers(&self) -> &[(DrawType, DataRef)] {
        &self.index_buffers
    }

    /// Vertex count, taken from the position attribute.
    pub fn vertex_count(&self) -> usize {
        self.attributes
            .get(&BufferType::Position)
            .map(|b| b.descriptor().element_count())
            .unwrap_or(0)
    }

    /// Every member buffer, attributes first.
    pub fn buffers(&self) -> impl Iterator<Item = &DataRef> {
        self.attributes
            .values()
            .chain(self.index_buffers.iter().map(|(_, b)| b))
    }

    /// Bring every member buffer to a valid `kind` representation.
    pub fn ensure_representation(
        &self,
        kind: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<()> {
        for buffer in self.buffers() {
            buffer.lock().get_representation(kind, registry)?;
        }
        Ok(())
    }

    pub fn clone_deep(&self) -> Self {
        Self {
            draw_type: self.draw_type,
            attributes: self
                .attributes
                .iter()
                .map(|(k, v)| (*k, v.deep_clone()))
                .collect(),
            index_buffers: self
                .index_buffers
                .iter()
                .map(|(d, b)| (*d, b.deep_clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::data::Data;
    use crate::datastructures::format::DataFormat;
    use crate::datastructures::representation::RamStorage;

    fn positions(n: usize) -> DataRef {
        Data::buffer(
            BufferType::Position,
            DataFormat::VEC3_FLOAT32,
            RamStorage::Float32(vec![0.0; n * 3]),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_attribute_replaces_same_role() {
        let mut mesh = Mesh::new(DrawType::Points);
        assert!(mesh.add_attribute(positions(2)).unwrap().is_none());
        assert!(mesh.add_attribute(positions(5)).unwrap().is_some());
        assert_eq!(mesh.vertex_count(), 5);
    }

    #[test]
    fn test_index_buffer_must_be_u32() {
        let mut mesh = Mesh::default();
        let bad = Data::buffer(
            BufferType::Index,
            DataFormat::FLOAT32,
            RamStorage::Float32(vec![0.0]),
        )
        .unwrap();
        assert!(mesh.add_index_buffer(DrawType::Lines, bad.into()).is_err());
        let good = Data::buffer(
            BufferType::Index,
            DataFormat::UINT32,
            RamStorage::UInt32(vec![0, 1]),
        )
        .unwrap();
        mesh.add_index_buffer(DrawType::Lines, good.into()).unwrap();
        assert_eq!(mesh.index_buffers().len(), 1);
        assert_eq!(mesh.buffers().count(), 1);
    }

    #[test]
    fn test_index_role_is_not_an_attribute() {
        let mut mesh = Mesh::default();
        let indices = Data::buffer(
            BufferType::Index,
            DataFormat::UINT32,
            RamStorage::UInt32(vec![0]),
        )
        .unwrap();
        assert!(mesh.add_attribute(indices.into()).is_err());
    }

    #[test]
    fn test_set_attribute_uses_given_role() {
        let mut mesh = Mesh::default();
        mesh.set_attribute(BufferType::Color, positions(3)).unwrap();
        assert!(mesh.attribute(BufferType::Color).is_some());
        assert_eq!(mesh.vertex_count(), 0);
        assert!(mesh.set_attribute(BufferType::Index, positions(1)).is_err());
    }

    #[test]
    fn test_clone_deep_detaches_buffers() {
        let mut mesh = Mesh::default();
        mesh.add_attribute(positions(1)).unwrap();
        let shallow = mesh.clone();
        let deep = mesh.clone_deep();
        let original = mesh.attribute(BufferType::Position).unwrap();
        assert!(original.ptr_eq(shallow.attribute(BufferType::Position).unwrap()));
        assert!(!original.ptr_eq(deep.attribute(BufferType::Position).unwrap()));
    }
}
