//! Single-backend storage views of a dataset.
//!
//! A [`Representation`] is one encoding of a [`Data`](super::Data) object's
//! content: a typed RAM array, an opaque device allocation, or a file on disk.
//! The payload is a closed tagged variant; the kind tag is derived from it.

use crate::datastructures::error::{DataError, DataResult};
use crate::datastructures::format::ElementType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Kind tag of a representation. Nodes of the conversion graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RepresentationKind {
    /// File-backed source, read lazily.
    Disk,
    /// Host memory array.
    Ram,
    /// OpenGL buffer/texture.
    Gl,
    /// OpenCL buffer/image.
    Cl,
    /// OpenCL object sharing an OpenGL allocation.
    ClGl,
}

impl RepresentationKind {
    pub const ALL: [RepresentationKind; 5] = [
        RepresentationKind::Disk,
        RepresentationKind::Ram,
        RepresentationKind::Gl,
        RepresentationKind::Cl,
        RepresentationKind::ClGl,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            RepresentationKind::Disk => "Disk",
            RepresentationKind::Ram => "RAM",
            RepresentationKind::Gl => "GL",
            RepresentationKind::Cl => "CL",
            RepresentationKind::ClGl => "CLGL",
        }
    }

    /// Whether the kind lives in device memory.
    pub const fn is_device(self) -> bool {
        matches!(
            self,
            RepresentationKind::Gl | RepresentationKind::Cl | RepresentationKind::ClGl
        )
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! for_each_storage {
    ($storage:expr, $v:ident => $body:expr) => {
        match $storage {
            RamStorage::UInt8($v) => $body,
            RamStorage::UInt16($v) => $body,
            RamStorage::UInt32($v) => $body,
            RamStorage::Int32($v) => $body,
            RamStorage::Float32($v) => $body,
            RamStorage::Float64($v) => $body,
        }
    };
}

/// Typed scalar storage of a RAM representation.
///
/// Channels are interleaved, so a `Vec3FLOAT32` buffer of 10 elements holds
/// 30 scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum RamStorage {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl RamStorage {
    /// Zero-filled storage holding `len` scalars.
    pub fn zeroed(element: ElementType, len: usize) -> Self {
        match element {
            ElementType::UInt8 => RamStorage::UInt8(vec![0; len]),
            ElementType::UInt16 => RamStorage::UInt16(vec![0; len]),
            ElementType::UInt32 => RamStorage::UInt32(vec![0; len]),
            ElementType::Int32 => RamStorage::Int32(vec![0; len]),
            ElementType::Float32 => RamStorage::Float32(vec![0.0; len]),
            ElementType::Float64 => RamStorage::Float64(vec![0.0; len]),
        }
    }

    /// Build storage from raw little-endian bytes.
    pub fn from_bytes(element: ElementType, bytes: &[u8]) -> DataResult<Self> {
        let element_size = element.size_in_bytes();
        if bytes.len() % element_size != 0 {
            return Err(DataError::MisalignedBytes {
                len: bytes.len(),
                element_size,
            });
        }
        Ok(match element {
            ElementType::UInt8 => RamStorage::UInt8(bytes.to_vec()),
            ElementType::UInt16 => RamStorage::UInt16(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::UInt32 => RamStorage::UInt32(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::Int32 => RamStorage::Int32(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::Float32 => RamStorage::Float32(bytemuck::pod_collect_to_vec(bytes)),
            ElementType::Float64 => RamStorage::Float64(bytemuck::pod_collect_to_vec(bytes)),
        })
    }

    /// Build storage of the given element type from `f64` values (numeric cast).
    pub fn from_f64(element: ElementType, values: &[f64]) -> Self {
        match element {
            ElementType::UInt8 => RamStorage::UInt8(values.iter().map(|&x| x as u8).collect()),
            ElementType::UInt16 => RamStorage::UInt16(values.iter().map(|&x| x as u16).collect()),
            ElementType::UInt32 => RamStorage::UInt32(values.iter().map(|&x| x as u32).collect()),
            ElementType::Int32 => RamStorage::Int32(values.iter().map(|&x| x as i32).collect()),
            ElementType::Float32 => {
                RamStorage::Float32(values.iter().map(|&x| x as f32).collect())
            }
            ElementType::Float64 => RamStorage::Float64(values.to_vec()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            RamStorage::UInt8(_) => ElementType::UInt8,
            RamStorage::UInt16(_) => ElementType::UInt16,
            RamStorage::UInt32(_) => ElementType::UInt32,
            RamStorage::Int32(_) => ElementType::Int32,
            RamStorage::Float32(_) => ElementType::Float32,
            RamStorage::Float64(_) => ElementType::Float64,
        }
    }

    /// Number of scalars.
    pub fn len(&self) -> usize {
        for_each_storage!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.element_type().size_in_bytes()
    }

    /// Raw byte view of the storage.
    pub fn as_bytes(&self) -> &[u8] {
        for_each_storage!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    /// Overwrite the storage with raw bytes, reusing the allocation when the
    /// element type matches.
    pub fn copy_from_bytes(&mut self, element: ElementType, bytes: &[u8]) -> DataResult<()> {
        if element != self.element_type() {
            *self = RamStorage::from_bytes(element, bytes)?;
            return Ok(());
        }
        let element_size = element.size_in_bytes();
        if bytes.len() % element_size != 0 {
            return Err(DataError::MisalignedBytes {
                len: bytes.len(),
                element_size,
            });
        }
        let len = bytes.len() / element_size;
        for_each_storage!(self, v => {
            v.resize(len, Default::default());
            bytemuck::cast_slice_mut::<_, u8>(v.as_mut_slice()).copy_from_slice(bytes);
        });
        Ok(())
    }

    /// Resize to `len` scalars, zero-filling new entries.
    pub fn resize(&mut self, len: usize) {
        for_each_storage!(self, v => v.resize(len, Default::default()))
    }

    /// All scalars widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        for_each_storage!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            RamStorage::Float32(v) => Some(v),
            _ => None,
        }
    }

    /// Element access only; the length stays tied to the data's shape.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            RamStorage::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<&[u32]> {
        match self {
            RamStorage::UInt32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            RamStorage::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64_mut(&mut self) -> Option<&mut [f64]> {
        match self {
            RamStorage::Float64(v) => Some(v),
            _ => None,
        }
    }
}

static NEXT_DEVICE_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Device-side allocation.
///
/// The bytes stand in for memory owned by the device backend; `handle` plays
/// the role of the backend object name. Interop representations share the
/// handle of the allocation they were created from.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStorage {
    backend: RepresentationKind,
    handle: u64,
    element: ElementType,
    bytes: Vec<u8>,
}

impl DeviceStorage {
    /// Allocate a new zeroed device object.
    pub fn allocate(backend: RepresentationKind, element: ElementType, size_in_bytes: usize) -> Self {
        debug_assert!(backend.is_device());
        Self {
            backend,
            handle: NEXT_DEVICE_HANDLE.fetch_add(1, Ordering::Relaxed),
            element,
            bytes: vec![0; size_in_bytes],
        }
    }

    /// Allocate a new device object and upload `bytes` into it.
    pub fn from_bytes(backend: RepresentationKind, element: ElementType, bytes: &[u8]) -> Self {
        let mut storage = Self::allocate(backend, element, 0);
        storage.upload(element, bytes);
        storage
    }

    /// Interop view of this allocation for another backend. Shares the handle.
    pub fn share(&self, backend: RepresentationKind) -> Self {
        Self {
            backend,
            handle: self.handle,
            element: self.element,
            bytes: self.bytes.clone(),
        }
    }

    pub fn backend(&self) -> RepresentationKind {
        self.backend
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Upload host bytes, reusing the existing allocation.
    pub fn upload(&mut self, element: ElementType, bytes: &[u8]) {
        self.element = element;
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    /// Download into a typed host array.
    pub fn download(&self) -> DataResult<RamStorage> {
        RamStorage::from_bytes(self.element, &self.bytes)
    }

    /// Run a kernel-like closure over the allocation viewed as `f32`.
    pub fn modify_f32(&mut self, f: impl FnOnce(&mut [f32])) -> DataResult<()> {
        if self.element != ElementType::Float32 {
            return Err(DataError::FormatMismatch(format!(
                "device object {} holds {}, not FLOAT32",
                self.handle,
                self.element.name()
            )));
        }
        let mut values: Vec<f32> = bytemuck::pod_collect_to_vec(&self.bytes);
        f(&mut values);
        self.bytes.copy_from_slice(bytemuck::cast_slice(&values));
        Ok(())
    }
}

/// File-backed source. The content is read when converted to RAM.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskSource {
    path: PathBuf,
}

impl DiskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw little-endian file content.
    pub fn read(&self, element: ElementType) -> DataResult<RamStorage> {
        let bytes = std::fs::read(&self.path).map_err(|e| DataError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        RamStorage::from_bytes(element, &bytes)
    }
}

/// Backend-specific payload of a representation.
#[derive(Debug, Clone, PartialEq)]
pub enum RepresentationPayload {
    Disk(DiskSource),
    Ram(RamStorage),
    Device(DeviceStorage),
}

/// One storage encoding of a dataset, plus its validity relative to the
/// owning data object.
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    payload: RepresentationPayload,
    valid: bool,
    version: u64,
}

impl Representation {
    pub fn new(payload: RepresentationPayload) -> Self {
        Self {
            payload,
            valid: true,
            version: 0,
        }
    }

    pub fn ram(storage: RamStorage) -> Self {
        Self::new(RepresentationPayload::Ram(storage))
    }

    pub fn device(storage: DeviceStorage) -> Self {
        Self::new(RepresentationPayload::Device(storage))
    }

    pub fn disk(source: DiskSource) -> Self {
        Self::new(RepresentationPayload::Disk(source))
    }

    pub fn kind(&self) -> RepresentationKind {
        match &self.payload {
            RepresentationPayload::Disk(_) => RepresentationKind::Disk,
            RepresentationPayload::Ram(_) => RepresentationKind::Ram,
            RepresentationPayload::Device(d) => d.backend(),
        }
    }

    /// Whether the content is in sync with the owning data object.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// Content generation of the owning data object this representation reflects.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Resident size. Disk sources report zero.
    pub fn size_in_bytes(&self) -> usize {
        match &self.payload {
            RepresentationPayload::Disk(_) => 0,
            RepresentationPayload::Ram(r) => r.size_in_bytes(),
            RepresentationPayload::Device(d) => d.size_in_bytes(),
        }
    }

    pub fn payload(&self) -> &RepresentationPayload {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut RepresentationPayload {
        &mut self.payload
    }

    pub fn as_ram(&self) -> Option<&RamStorage> {
        match &self.payload {
            RepresentationPayload::Ram(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ram_mut(&mut self) -> Option<&mut RamStorage> {
        match &mut self.payload {
            RepresentationPayload::Ram(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_device(&self) -> Option<&DeviceStorage> {
        match &self.payload {
            RepresentationPayload::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_device_mut(&mut self) -> Option<&mut DeviceStorage> {
        match &mut self.payload {
            RepresentationPayload::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_disk(&self) -> Option<&DiskSource> {
        match &self.payload {
            RepresentationPayload::Disk(d) => Some(d),
            _ => None,
        }
    }

    /// Typed RAM access, or an error naming the actual kind.
    pub fn expect_ram(&self) -> DataResult<&RamStorage> {
        let found = self.kind();
        self.as_ram().ok_or(DataError::UnexpectedRepresentation {
            expected: RepresentationKind::Ram,
            found,
        })
    }

    /// Device access for the `backend` allocation, or an error naming both kinds.
    pub fn expect_device(&self, backend: RepresentationKind) -> DataResult<&DeviceStorage> {
        let found = self.kind();
        self.as_device()
            .filter(|device| device.backend() == backend)
            .ok_or(DataError::UnexpectedRepresentation {
                expected: backend,
                found,
            })
    }
}

/// Write access handed out by `Data::get_editable_representation`.
///
/// Contents can be edited in place, but the payload cannot be swapped or
/// resized, so the representation keeps its kind and the data's shape.
#[derive(Debug)]
pub struct RepresentationMut<'a> {
    rep: &'a mut Representation,
}

impl<'a> RepresentationMut<'a> {
    pub(crate) fn new(rep: &'a mut Representation) -> Self {
        Self { rep }
    }

    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        self.rep.as_ram_mut().and_then(RamStorage::as_f32_mut)
    }

    pub fn as_f64_mut(&mut self) -> Option<&mut [f64]> {
        self.rep.as_ram_mut().and_then(RamStorage::as_f64_mut)
    }

    /// Run `f` over FLOAT32 contents, on the host or on the device.
    pub fn modify_f32(&mut self, f: impl FnOnce(&mut [f32])) -> DataResult<()> {
        let kind = self.rep.kind();
        match self.rep.payload_mut() {
            RepresentationPayload::Ram(ram) => {
                let element = ram.element_type();
                let values = ram.as_f32_mut().ok_or_else(|| {
                    DataError::FormatMismatch(format!(
                        "{kind} representation holds {}, not FLOAT32",
                        element.name()
                    ))
                })?;
                f(values);
                Ok(())
            }
            RepresentationPayload::Device(device) => device.modify_f32(f),
            RepresentationPayload::Disk(_) => Err(DataError::UnexpectedRepresentation {
                expected: RepresentationKind::Ram,
                found: kind,
            }),
        }
    }
}

impl std::ops::Deref for RepresentationMut<'_> {
    type Target = Representation;

    fn deref(&self) -> &Representation {
        self.rep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_bytes_round_trip() {
        let storage = RamStorage::Float32(vec![1.0, 2.0, 3.0]);
        let bytes = storage.as_bytes().to_vec();
        assert_eq!(bytes.len(), 12);
        let back = RamStorage::from_bytes(ElementType::Float32, &bytes).unwrap();
        assert_eq!(back, storage);
    }

    #[test]
    fn test_misaligned_bytes_rejected() {
        let err = RamStorage::from_bytes(ElementType::UInt32, &[0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            DataError::MisalignedBytes {
                len: 3,
                element_size: 4
            }
        );
    }

    #[test]
    fn test_copy_from_bytes_reuses_storage() {
        let mut storage = RamStorage::Float32(Vec::with_capacity(16));
        let source = RamStorage::Float32(vec![4.0, 5.0]);
        storage
            .copy_from_bytes(ElementType::Float32, source.as_bytes())
            .unwrap();
        assert_eq!(storage.as_f32(), Some(&[4.0f32, 5.0][..]));
        if let RamStorage::Float32(v) = &storage {
            assert!(v.capacity() >= 16);
        }
    }

    #[test]
    fn test_copy_from_bytes_changes_element_type() {
        let mut storage = RamStorage::UInt8(vec![1, 2, 3]);
        let source = RamStorage::UInt32(vec![7]);
        storage
            .copy_from_bytes(ElementType::UInt32, source.as_bytes())
            .unwrap();
        assert_eq!(storage.as_u32(), Some(&[7u32][..]));
    }

    #[test]
    fn test_resize_and_widen() {
        let mut storage = RamStorage::Int32(vec![-1, 2]);
        storage.resize(4);
        assert_eq!(storage.to_f64_vec(), vec![-1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_device_share_keeps_handle() {
        let gl = DeviceStorage::from_bytes(RepresentationKind::Gl, ElementType::UInt8, &[1, 2]);
        let clgl = gl.share(RepresentationKind::ClGl);
        assert_eq!(gl.handle(), clgl.handle());
        assert_eq!(clgl.backend(), RepresentationKind::ClGl);
        assert_eq!(clgl.bytes(), &[1, 2]);
    }

    #[test]
    fn test_device_allocations_get_distinct_handles() {
        let a = DeviceStorage::allocate(RepresentationKind::Cl, ElementType::Float32, 4);
        let b = DeviceStorage::allocate(RepresentationKind::Cl, ElementType::Float32, 4);
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn test_device_modify_f32() {
        let ram = RamStorage::Float32(vec![1.0, 2.0]);
        let mut dev =
            DeviceStorage::from_bytes(RepresentationKind::Cl, ElementType::Float32, ram.as_bytes());
        dev.modify_f32(|v| v.iter_mut().for_each(|x| *x *= 3.0)).unwrap();
        assert_eq!(dev.download().unwrap().as_f32(), Some(&[3.0f32, 6.0][..]));
    }

    #[test]
    fn test_representation_kind_from_payload() {
        let rep = Representation::device(DeviceStorage::allocate(
            RepresentationKind::Gl,
            ElementType::UInt8,
            0,
        ));
        assert_eq!(rep.kind(), RepresentationKind::Gl);
        assert!(rep.is_valid());
        assert!(rep.expect_ram().is_err());
        assert!(rep.expect_device(RepresentationKind::Gl).is_ok());
    }

    #[test]
    fn test_expect_device_names_requested_backend() {
        let rep = Representation::device(DeviceStorage::allocate(
            RepresentationKind::Gl,
            ElementType::Float32,
            4,
        ));
        assert_eq!(
            rep.expect_device(RepresentationKind::Cl).unwrap_err(),
            DataError::UnexpectedRepresentation {
                expected: RepresentationKind::Cl,
                found: RepresentationKind::Gl,
            }
        );
        let ram = Representation::ram(RamStorage::Float32(vec![1.0]));
        assert_eq!(
            ram.expect_device(RepresentationKind::ClGl).unwrap_err(),
            DataError::UnexpectedRepresentation {
                expected: RepresentationKind::ClGl,
                found: RepresentationKind::Ram,
            }
        );
    }

    #[test]
    fn test_editable_handle_edits_in_place() {
        let mut rep = Representation::ram(RamStorage::Float32(vec![1.0, 2.0]));
        let mut edit = RepresentationMut::new(&mut rep);
        edit.as_f32_mut().unwrap()[1] = 5.0;
        edit.modify_f32(|v| v.iter_mut().for_each(|x| *x += 1.0)).unwrap();
        assert_eq!(edit.kind(), RepresentationKind::Ram);
        assert!(edit.as_f64_mut().is_none());
        assert_eq!(rep.as_ram().unwrap().as_f32(), Some(&[2.0f32, 6.0][..]));

        let mut ints = Representation::ram(RamStorage::UInt8(vec![1]));
        assert!(matches!(
            RepresentationMut::new(&mut ints).modify_f32(|_| {}),
            Err(DataError::FormatMismatch(_))
        ));
    }
}
