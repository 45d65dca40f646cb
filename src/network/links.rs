//! Property links and property edits.
//!
//! Links form their own graph, independent of the data connections, and may
//! be cyclic. A property change is propagated by one breadth-first traversal
//! that visits each destination property at most once, so propagation
//! terminates on any link graph.

use crate::network::error::{NetworkError, NetworkResult};
use crate::network::events::NetworkEvent;
use crate::network::processor_network::{ProcessorNetwork, PropertyLink, PropertyPath};
use crate::network::property::{Property, PropertyValue};
use std::collections::{HashSet, VecDeque};

impl ProcessorNetwork {
    fn resolve_property(&self, path: &PropertyPath) -> NetworkResult<&Property> {
        self.property(&path.processor, &path.property)
    }

    /// Link `source` to `destination`. Both properties must exist and hold
    /// the same value type.
    pub fn add_link(
        &mut self,
        source: PropertyPath,
        destination: PropertyPath,
    ) -> NetworkResult<()> {
        let src = self.resolve_property(&source)?;
        let dst = self.resolve_property(&destination)?;
        if source == destination {
            return Err(NetworkError::InvalidLink(format!(
                "{source} cannot be linked to itself"
            )));
        }
        if !src.value().same_type(dst.value()) {
            return Err(NetworkError::InvalidLink(format!(
                "{} holds {}, {} holds {}",
                source,
                src.value().type_name(),
                destination,
                dst.value().type_name()
            )));
        }
        let link = PropertyLink::new(source, destination);
        if self.links.contains(&link) {
            return Err(NetworkError::DuplicateLink {
                source_property: link.source.to_string(),
                destination: link.destination.to_string(),
            });
        }

        tracing::info!("Linked {} -> {}", link.source, link.destination);
        self.observers.emit(NetworkEvent::LinkAdded {
            source: link.source.to_string(),
            destination: link.destination.to_string(),
        });
        self.links.push(link);
        Ok(())
    }

    pub fn remove_link(
        &mut self,
        source: &PropertyPath,
        destination: &PropertyPath,
    ) -> NetworkResult<()> {
        let position = self
            .links
            .iter()
            .position(|l| &l.source == source && &l.destination == destination)
            .ok_or_else(|| NetworkError::LinkNotFound {
                source_property: source.to_string(),
                destination: destination.to_string(),
            })?;
        let link = self.links.remove(position);
        tracing::info!("Unlinked {} -> {}", link.source, link.destination);
        self.observers.emit(NetworkEvent::LinkRemoved {
            source: link.source.to_string(),
            destination: link.destination.to_string(),
        });
        Ok(())
    }

    pub fn links(&self) -> &[PropertyLink] {
        &self.links
    }

    /// Links leaving `source`, in creation order.
    pub fn links_from<'a>(
        &'a self,
        source: &'a PropertyPath,
    ) -> impl Iterator<Item = &'a PropertyLink> + 'a {
        self.links.iter().filter(move |l| &l.source == source)
    }

    /// Set a property and propagate the new value along links.
    ///
    /// Returns whether the property itself changed. Each changed property
    /// invalidates its processor at the property's invalidation level.
    /// Linked destinations that are read-only or hold another value type are
    /// skipped with a warning.
    pub fn set_property(
        &mut self,
        processor: &str,
        property: &str,
        value: PropertyValue,
    ) -> NetworkResult<bool> {
        let origin = PropertyPath::new(processor, property);
        if !self.apply_property(&origin, value)? {
            return Ok(false);
        }

        let mut visited: HashSet<PropertyPath> = HashSet::from([origin.clone()]);
        let mut queue = VecDeque::from([origin]);
        while let Some(source) = queue.pop_front() {
            let value = self.resolve_property(&source)?.value().clone();
            let destinations: Vec<PropertyPath> = self
                .links_from(&source)
                .map(|l| l.destination.clone())
                .collect();
            for destination in destinations {
                if !visited.insert(destination.clone()) {
                    continue;
                }
                match self.apply_property(&destination, value.clone()) {
                    Ok(_) => queue.push_back(destination),
                    Err(e) => tracing::warn!(
                        "Link {} -> {} not applied: {}",
                        source,
                        destination,
                        e
                    ),
                }
            }
        }
        Ok(true)
    }

    /// Restore a property's default value, propagating like `set_property`.
    pub fn reset_property(&mut self, processor: &str, property: &str) -> NetworkResult<bool> {
        let default = self.property(processor, property)?.default_value().clone();
        self.set_property(processor, property, default)
    }

    fn apply_property(&mut self, path: &PropertyPath, value: PropertyValue) -> NetworkResult<bool> {
        let id = self.processor_id(&path.processor)?;
        let slot = self.slot_mut(id)?;
        let property = slot
            .properties
            .get_mut(&path.property)
            .ok_or_else(|| NetworkError::UnknownProperty(path.to_string()))?;
        if !property.set(value)? {
            return Ok(false);
        }
        let level = property.invalidation_level();
        slot.processor.on_property_change(property);

        tracing::debug!("Property {} changed", path);
        self.observers.emit(NetworkEvent::PropertyChanged {
            processor: path.processor.clone(),
            property: path.property.clone(),
        });
        self.invalidate_id(id, level);
        Ok(true)
    }
}
