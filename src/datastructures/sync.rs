//! Scoped acquisition of shared data objects.
//!
//! [`SharedResources`] locks a set of data objects for the duration of a
//! device operation, the way a compute kernel acquires objects it shares with
//! the graphics context. Locks are taken in address order after removing
//! duplicates, and released when the guard drops, on every exit path.

use crate::datastructures::converter::ConverterRegistry;
use crate::datastructures::data::{Data, DataRef};
use crate::datastructures::error::DataResult;
use crate::datastructures::representation::RepresentationKind;
use std::sync::MutexGuard;

pub struct SharedResources<'a> {
    guards: Vec<MutexGuard<'a, Data>>,
    /// Input index -> guard index.
    slots: Vec<usize>,
}

impl<'a> SharedResources<'a> {
    /// Lock every object in `resources`.
    pub fn acquire(resources: &'a [DataRef]) -> Self {
        let mut order: Vec<(usize, usize)> = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.addr(), i))
            .collect();
        order.sort_unstable();

        let mut slots = vec![0; resources.len()];
        let mut unique: Vec<usize> = Vec::with_capacity(order.len());
        let mut last_addr = None;
        for (addr, index) in order {
            if last_addr != Some(addr) {
                unique.push(index);
                last_addr = Some(addr);
            }
            slots[index] = unique.len() - 1;
        }

        let guards: Vec<_> = unique.iter().map(|&i| resources[i].lock()).collect();
        tracing::trace!("Acquired {} shared resources", guards.len());
        Self { guards, slots }
    }

    /// Lock every object and bring each to a valid `kind` representation.
    /// All locks are released if any conversion fails.
    pub fn acquire_as(
        resources: &'a [DataRef],
        kind: RepresentationKind,
        registry: &ConverterRegistry,
    ) -> DataResult<Self> {
        let mut shared = Self::acquire(resources);
        for guard in shared.guards.iter_mut() {
            guard.get_representation(kind, registry)?;
        }
        Ok(shared)
    }

    /// Number of distinct objects held.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Data at position `index` of the acquired list.
    pub fn get(&self, index: usize) -> Option<&Data> {
        let slot = *self.slots.get(index)?;
        self.guards.get(slot).map(|g| &**g)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Data> {
        let slot = *self.slots.get(index)?;
        self.guards.get_mut(slot).map(|g| &mut **g)
    }
}

impl Drop for SharedResources<'_> {
    fn drop(&mut self) {
        tracing::trace!("Released {} shared resources", self.guards.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::data::BufferType;
    use crate::datastructures::format::DataFormat;
    use crate::datastructures::representation::RamStorage;

    fn buffer(value: f32) -> DataRef {
        Data::buffer(
            BufferType::Position,
            DataFormat::FLOAT32,
            RamStorage::Float32(vec![value]),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_duplicates_are_locked_once() {
        let a = buffer(1.0);
        let b = buffer(2.0);
        let list = vec![a.clone(), b.clone(), a.clone()];
        let shared = SharedResources::acquire(&list);
        assert_eq!(shared.len(), 2);
        assert!(std::ptr::eq(shared.get(0).unwrap(), shared.get(2).unwrap()));
    }

    #[test]
    fn test_locks_released_on_drop() {
        let a = buffer(1.0);
        let list = vec![a.clone()];
        {
            let mut shared = SharedResources::acquire(&list);
            shared.get_mut(0).unwrap().resize([2, 1, 1]);
        }
        assert_eq!(a.lock().dimensions(), [2, 1, 1]);
    }

    #[test]
    fn test_failed_acquire_releases() {
        let a = buffer(1.0);
        let list = vec![a.clone()];
        let registry = ConverterRegistry::new();
        assert!(SharedResources::acquire_as(&list, RepresentationKind::Cl, &registry).is_err());
        assert!(a.try_lock().is_some());
    }
}
