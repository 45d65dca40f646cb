//! Multi-representation data container.
//!
//! A [`Data`] object owns at most one [`Representation`] per kind. Exactly one
//! of them is authoritative (the latest edited or converted content); the
//! others are either synchronized with it or stale. Stale representations are
//! kept so their storage can be reused by the converter's `update`.

use crate::datastructures::converter::ConverterRegistry;
use crate::datastructures::error::{DataError, DataResult};
use crate::datastructures::format::DataFormat;
use crate::datastructures::representation::{
    DiskSource, RamStorage, Representation, RepresentationKind, RepresentationMut,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Semantic role of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BufferType {
    Position,
    Normal,
    Color,
    TexCoord,
    Curvature,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Color,
    Depth,
    Picking,
}

/// Data class of a container, with its role tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataClass {
    Buffer {
        buffer_type: BufferType,
        usage: BufferUsage,
    },
    Layer {
        layer_type: LayerType,
    },
    Volume,
}

impl DataClass {
    pub const BUFFER_ID: &'static str = "org.visnet.Buffer";
    pub const LAYER_ID: &'static str = "org.visnet.Layer";
    pub const VOLUME_ID: &'static str = "org.visnet.Volume";

    pub const fn class_identifier(&self) -> &'static str {
        match self {
            DataClass::Buffer { .. } => Self::BUFFER_ID,
            DataClass::Layer { .. } => Self::LAYER_ID,
            DataClass::Volume => Self::VOLUME_ID,
        }
    }

    pub const fn buffer(buffer_type: BufferType) -> Self {
        DataClass::Buffer {
            buffer_type,
            usage: BufferUsage::Static,
        }
    }
}

/// Shape and format of a dataset, shared by all its representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub class: DataClass,
    pub format: DataFormat,
    /// Extent in elements. Buffers use `[len, 1, 1]`, layers `[w, h, 1]`.
    pub dimensions: [usize; 3],
}

impl DataDescriptor {
    pub const fn new(class: DataClass, format: DataFormat, dimensions: [usize; 3]) -> Self {
        Self {
            class,
            format,
            dimensions,
        }
    }

    pub fn element_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Number of scalars (elements times channels).
    pub fn scalar_count(&self) -> usize {
        self.element_count() * self.format.channels as usize
    }

    pub fn size_in_bytes(&self) -> usize {
        self.element_count() * self.format.size_in_bytes()
    }
}

/// A logical dataset with lazily converted representations.
pub struct Data {
    descriptor: DataDescriptor,
    representations: BTreeMap<RepresentationKind, Representation>,
    authoritative: Option<RepresentationKind>,
    generation: u64,
}

impl Data {
    /// Empty data object. The first access creates a zeroed RAM representation.
    pub fn new(descriptor: DataDescriptor) -> Self {
        Self {
            descriptor,
            representations: BTreeMap::new(),
            authoritative: None,
            generation: 0,
        }
    }

    /// Data whose authoritative content is the given RAM storage.
    pub fn with_ram(descriptor: DataDescriptor, storage: RamStorage) -> DataResult<Self> {
        descriptor.format.validate()?;
        if storage.element_type() != descriptor.format.element {
            return Err(DataError::FormatMismatch(format!(
                "storage holds {}, descriptor expects {}",
                storage.element_type().name(),
                descriptor.format
            )));
        }
        if storage.len() != descriptor.scalar_count() {
            return Err(DataError::SizeMismatch {
                expected: descriptor.scalar_count(),
                actual: storage.len(),
            });
        }
        let mut data = Self::new(descriptor);
        data.insert_authoritative(Representation::ram(storage));
        Ok(data)
    }

    /// Data backed by a raw file; content is read on first conversion.
    pub fn from_disk(descriptor: DataDescriptor, path: impl Into<PathBuf>) -> Self {
        let mut data = Self::new(descriptor);
        data.insert_authoritative(Representation::disk(DiskSource::new(path)));
        data
    }

    /// Buffer of the given role holding `storage`. The element count is
    /// derived from the storage length and channel count.
    pub fn buffer(
        buffer_type: BufferType,
        format: DataFormat,
        storage: RamStorage,
    ) -> DataResult<Self> {
        format.validate()?;
        let channels = format.channels as usize;
        if storage.len() % channels != 0 {
            return Err(DataError::SizeMismatch {
                expected: storage.len().next_multiple_of(channels),
                actual: storage.len(),
            });
        }
        let descriptor = DataDescriptor::new(
            DataClass::buffer(buffer_type),
            format,
            [storage.len() / channels, 1, 1],
        );
        Self::with_ram(descriptor, storage)
    }

    fn insert_authoritative(&mut self, mut rep: Representation) {
        let kind = rep.kind();
        rep.set_valid(true);
        rep.set_version(self.generation);
        self.representations.insert(kind, rep);
        self.authoritative = Some(kind);
    }

    pub fn descriptor(&self) -> &DataDescriptor {
        &self.descriptor
    }

    pub fn format(&self) -> DataFormat {
        self.descriptor.format
    }

    pub fn dimensions(&self) -> [usize; 3] {
        self.descriptor.dimensions
    }

    pub fn class(&self) -> DataClass {
        self.descriptor.class
    }

    /// Content generation; bumped on every edit and resize.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn authoritative_kind(&self) -> Option<RepresentationKind> {
        self.authoritative
    }

    pub fn has_representation(&self, kind: RepresentationKind) -> bool {
        self.representations.contains_key(&kind)
    }

    pub fn is_valid(&self, kind: RepresentationKind) -> bool {
        self.representations
            .get(&kind)
            .is_some_and(Representation::is_valid)
    }

    /// Kinds currently held, valid or stale, in kind order.
    pub fn representation_kinds(&self) -> Vec<RepresentationKind> {
        self.representations.keys().copied().collect()
    }

    /// Summed resident size of every held representation.
    pub fn size_in_bytes(&self) -> usize {
        self.representations
            .values()
            .map(Representation::size_in_bytes)
            .sum()
    }

    /// Held representation without conversion, valid or not.
    pub fn peek_representation(&self, kind: RepresentationKind) -> Option<&Representation> {
        self.representations.get(&kind)
    }

    /// Read access to the `kind` representation, converting from the
    /// authoritative one when it is absent or stale.
    pub fn get_representation(
        &mut self,
        kind: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<&Representation> {
        self.ensure_valid(kind, registry)?;
        self.authoritative = Some(kind);
        self.representations
            .get(&kind)
            .ok_or(DataError::ConversionUnavailable {
                from: kind,
                to: kind,
            })
    }

    /// Write access to the `kind` representation. Marks it authoritative and
    /// every other representation stale.
    pub fn get_editable_representation(
        &mut self,
        kind: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<RepresentationMut<'_>> {
        self.ensure_valid(kind, registry)?;
        self.generation += 1;
        let generation = self.generation;
        for (k, rep) in self.representations.iter_mut() {
            if *k == kind {
                rep.set_version(generation);
            } else {
                rep.set_valid(false);
            }
        }
        self.authoritative = Some(kind);
        self.representations
            .get_mut(&kind)
            .map(RepresentationMut::new)
            .ok_or(DataError::ConversionUnavailable {
                from: kind,
                to: kind,
            })
    }

    /// Change the shape. All representations become stale; the next access
    /// starts again from a zeroed RAM representation.
    pub fn resize(&mut self, dimensions: [usize; 3]) {
        if dimensions == self.descriptor.dimensions {
            return;
        }
        self.descriptor.dimensions = dimensions;
        self.generation += 1;
        for rep in self.representations.values_mut() {
            rep.set_valid(false);
        }
        self.authoritative = None;
    }

    /// Drop every representation except the authoritative one.
    pub fn remove_other_representations(&mut self) {
        match self.authoritative {
            Some(kind) => self.representations.retain(|k, _| *k == kind),
            None => self.representations.clear(),
        }
    }

    fn ensure_valid(
        &mut self,
        kind: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<()> {
        if self.is_valid(kind) {
            return Ok(());
        }

        let source = match self.authoritative {
            Some(source) => source,
            None => {
                self.create_default_representation();
                RepresentationKind::Ram
            }
        };
        if source == kind {
            return Ok(());
        }

        let path = registry
            .find_path(source, kind)
            .ok_or(DataError::ConversionUnavailable {
                from: source,
                to: kind,
            })?;

        for (from, to) in path.steps {
            if self.is_valid(to) {
                continue;
            }
            self.convert_hop(from, to, registry)?;
        }
        Ok(())
    }

    fn convert_hop(
        &mut self,
        from: RepresentationKind,
        to: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<()> {
        let stale = self.representations.remove(&to);
        let Some(source) = self.representations.get(&from) else {
            if let Some(rep) = stale {
                self.representations.insert(to, rep);
            }
            return Err(DataError::ConversionUnavailable { from, to });
        };

        let converted = match stale {
            Some(mut dst) => {
                match registry.convert(from, to, source, Some(&mut dst), &self.descriptor) {
                    Ok(_) => Ok(dst),
                    Err(e) => {
                        dst.set_valid(false);
                        Err((e, Some(dst)))
                    }
                }
            }
            None => registry
                .convert(from, to, source, None, &self.descriptor)
                .and_then(|rep| rep.ok_or(DataError::ConversionUnavailable { from, to }))
                .map_err(|e| (e, None)),
        };
        let mut rep = match converted {
            Ok(rep) => rep,
            Err((e, stale)) => {
                if let Some(rep) = stale {
                    self.representations.insert(to, rep);
                }
                return Err(e);
            }
        };
        if rep.kind() != to {
            return Err(DataError::ConversionFailed {
                from,
                to,
                message: format!("converter produced a {} representation", rep.kind()),
            });
        }
        rep.set_valid(true);
        rep.set_version(self.generation);
        tracing::trace!("Converted {} -> {} ({} bytes)", from, to, rep.size_in_bytes());
        self.representations.insert(to, rep);
        Ok(())
    }

    fn create_default_representation(&mut self) {
        let storage = RamStorage::zeroed(
            self.descriptor.format.element,
            self.descriptor.scalar_count(),
        );
        tracing::trace!(
            "Creating default RAM representation for {} {:?}",
            self.descriptor.class.class_identifier(),
            self.descriptor.dimensions
        );
        self.insert_authoritative(Representation::ram(storage));
    }
}

impl Clone for Data {
    /// Copies the authoritative representation only.
    fn clone(&self) -> Self {
        let mut copy = Data::new(self.descriptor);
        copy.generation = self.generation;
        if let Some(kind) = self.authoritative {
            if let Some(rep) = self.representations.get(&kind) {
                copy.representations.insert(kind, rep.clone());
                copy.authoritative = Some(kind);
            }
        }
        copy
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("class", &self.descriptor.class)
            .field("format", &self.descriptor.format.name())
            .field("dimensions", &self.descriptor.dimensions)
            .field("authoritative", &self.authoritative)
            .field("kinds", &self.representation_kinds())
            .finish()
    }
}

/// Shared handle to a data object. Lifetime extends to the longest holder.
///
/// The class never changes after construction, so the handle keeps a copy
/// that can be read without locking.
#[derive(Clone)]
pub struct DataRef {
    data: Arc<Mutex<Data>>,
    class: DataClass,
}

impl DataRef {
    pub fn new(data: Data) -> Self {
        Self {
            class: data.descriptor().class,
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Lock the data object. A poisoned lock is recovered; the data itself
    /// keeps its invariants across a panicking `process()`.
    pub fn lock(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock without blocking; `None` while another holder has the lock.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Data>> {
        match self.data.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn ptr_eq(&self, other: &DataRef) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Stable address used to order lock acquisition.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.data) as usize
    }

    /// Class of the data object. Does not lock.
    pub fn class(&self) -> DataClass {
        self.class
    }

    /// Current descriptor. Locks the data object, so it must not be called
    /// while this thread holds a guard from [`DataRef::lock`].
    pub fn descriptor(&self) -> DataDescriptor {
        *self.lock().descriptor()
    }

    /// Number of live handles.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Deep copy (authoritative representation only) behind a new handle.
    pub fn deep_clone(&self) -> Self {
        Self::new(self.lock().clone())
    }
}

impl From<Data> for DataRef {
    fn from(data: Data) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataRef({:#x})", self.addr())
    }
}

type DataConstructor = Box<dyn Fn(DataFormat, [usize; 3]) -> Data + Send + Sync>;

/// Creates data objects from class identifiers.
#[derive(Default)]
pub struct DataFactory {
    constructors: HashMap<String, DataConstructor>,
}

impl DataFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, class_identifier: impl Into<String>, constructor: F)
    where
        F: Fn(DataFormat, [usize; 3]) -> Data + Send + Sync + 'static,
    {
        let id = class_identifier.into();
        if self
            .constructors
            .insert(id.clone(), Box::new(constructor))
            .is_some()
        {
            tracing::warn!("Data class {} registered twice", id);
        }
    }

    pub fn create(
        &self,
        class_identifier: &str,
        format: DataFormat,
        dimensions: [usize; 3],
    ) -> DataResult<Data> {
        self.constructors
            .get(class_identifier)
            .map(|ctor| ctor(format, dimensions))
            .ok_or_else(|| DataError::UnknownClass(class_identifier.to_string()))
    }

    pub fn has_class(&self, class_identifier: &str) -> bool {
        self.constructors.contains_key(class_identifier)
    }

    pub fn class_identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for DataFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFactory")
            .field("classes", &self.class_identifiers())
            .finish()
    }
}
