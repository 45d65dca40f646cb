//! Processor factory keyed by class identifier.

use crate::network::error::{NetworkError, NetworkResult};
use crate::network::processor::{AnyProcessor, ProcessorInfo};
use std::collections::BTreeMap;
use std::fmt;

type ProcessorConstructor = Box<dyn Fn() -> AnyProcessor + Send + Sync>;

struct FactoryEntry {
    info: ProcessorInfo,
    constructor: ProcessorConstructor,
}

/// Creates processors by class identifier. Populated by modules.
#[derive(Default)]
pub struct ProcessorFactory {
    entries: BTreeMap<String, FactoryEntry>,
}

impl ProcessorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor class. A later registration under the same class
    /// identifier replaces the earlier one.
    pub fn register<F>(&mut self, info: ProcessorInfo, constructor: F)
    where
        F: Fn() -> AnyProcessor + Send + Sync + 'static,
    {
        let entry = FactoryEntry {
            info,
            constructor: Box::new(constructor),
        };
        if self
            .entries
            .insert(info.class_identifier.to_string(), entry)
            .is_some()
        {
            tracing::warn!("Processor class {} registered twice", info.class_identifier);
        }
    }

    pub fn create(&self, class_identifier: &str) -> NetworkResult<AnyProcessor> {
        self.entries
            .get(class_identifier)
            .map(|entry| (entry.constructor)())
            .ok_or_else(|| NetworkError::UnknownClass(class_identifier.to_string()))
    }

    pub fn has_class(&self, class_identifier: &str) -> bool {
        self.entries.contains_key(class_identifier)
    }

    pub fn info(&self, class_identifier: &str) -> Option<ProcessorInfo> {
        self.entries.get(class_identifier).map(|entry| entry.info)
    }

    /// Registered classes, sorted by class identifier.
    pub fn infos(&self) -> impl Iterator<Item = ProcessorInfo> + '_ {
        self.entries.values().map(|entry| entry.info)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for ProcessorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorFactory")
            .field("classes", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::processors::BufferSource;

    #[test]
    fn test_create_by_class() {
        let mut factory = ProcessorFactory::new();
        factory.register(BufferSource::INFO, || BufferSource.into());
        let processor = factory.create("org.visnet.BufferSource").unwrap();
        assert_eq!(processor.info(), BufferSource::INFO);
        assert!(matches!(
            factory.create("org.visnet.Nothing"),
            Err(NetworkError::UnknownClass(_))
        ));
    }
}
