//! Representation converters and the registry that plans conversions.
//!
//! Converters are edges of a small directed graph whose nodes are
//! [`RepresentationKind`]s. A conversion request is served by the cheapest
//! path through that graph; equal-cost paths are decided by the registration
//! order of their edges, earliest first.

use crate::datastructures::data::DataDescriptor;
use crate::datastructures::error::{DataError, DataResult};
use crate::datastructures::representation::{Representation, RepresentationKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Converts one representation kind into another.
pub trait RepresentationConverter: Send + Sync {
    /// Build a fresh destination representation from `source`.
    fn create_from(
        &self,
        source: &Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<Representation>;

    /// Refresh an existing (stale) destination in place. Implementations
    /// should reuse the destination's storage; the default rebuilds it.
    fn update(
        &self,
        source: &Representation,
        destination: &mut Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<()> {
        *destination = self.create_from(source, descriptor)?;
        Ok(())
    }

    /// Edge weight used by path planning.
    fn cost(&self) -> u32 {
        1
    }
}

/// Adapter turning a closure into a converter with unit cost.
pub struct FnConverter<F> {
    func: F,
}

impl<F> FnConverter<F>
where
    F: Fn(&Representation, &DataDescriptor) -> DataResult<Representation> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> RepresentationConverter for FnConverter<F>
where
    F: Fn(&Representation, &DataDescriptor) -> DataResult<Representation> + Send + Sync,
{
    fn create_from(
        &self,
        source: &Representation,
        descriptor: &DataDescriptor,
    ) -> DataResult<Representation> {
        (self.func)(source, descriptor)
    }
}

/// One planned conversion: the hops to apply and their summed cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPath {
    pub steps: Vec<(RepresentationKind, RepresentationKind)>,
    pub cost: u32,
}

impl ConversionPath {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

struct ConverterEntry {
    order: u64,
    converter: Arc<dyn RepresentationConverter>,
}

/// Registry of converters keyed by (from, to).
pub struct ConverterRegistry {
    entries: HashMap<(RepresentationKind, RepresentationKind), ConverterEntry>,
    next_order: u64,
    warn_on_override: bool,
    path_cache: Mutex<HashMap<(RepresentationKind, RepresentationKind), Option<ConversionPath>>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("pairs", &self.pairs())
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_order: 0,
            warn_on_override: true,
            path_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_warn_on_override(mut self, warn: bool) -> Self {
        self.warn_on_override = warn;
        self
    }

    /// Register a forward-only converter. A second registration for the same
    /// pair replaces the first.
    pub fn register_converter(
        &mut self,
        from: RepresentationKind,
        to: RepresentationKind,
        converter: impl RepresentationConverter + 'static,
    ) {
        self.register_shared(from, to, Arc::new(converter));
    }

    /// Register a closure as a unit-cost converter.
    pub fn register_fn<F>(&mut self, from: RepresentationKind, to: RepresentationKind, func: F)
    where
        F: Fn(&Representation, &DataDescriptor) -> DataResult<Representation>
            + Send
            + Sync
            + 'static,
    {
        self.register_converter(from, to, FnConverter::new(func));
    }

    pub fn register_shared(
        &mut self,
        from: RepresentationKind,
        to: RepresentationKind,
        converter: Arc<dyn RepresentationConverter>,
    ) {
        let order = self.next_order;
        self.next_order += 1;
        let previous = self
            .entries
            .insert((from, to), ConverterEntry { order, converter });
        if previous.is_some() {
            if self.warn_on_override {
                tracing::warn!("Converter {} -> {} replaced by a later registration", from, to);
            }
        } else {
            tracing::debug!("Registered converter {} -> {}", from, to);
        }
        self.path_cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn has_converter(&self, from: RepresentationKind, to: RepresentationKind) -> bool {
        self.entries.contains_key(&(from, to))
    }

    pub fn converter(
        &self,
        from: RepresentationKind,
        to: RepresentationKind,
    ) -> Option<Arc<dyn RepresentationConverter>> {
        self.entries.get(&(from, to)).map(|e| Arc::clone(&e.converter))
    }

    /// Registered pairs in registration order.
    pub fn pairs(&self) -> Vec<(RepresentationKind, RepresentationKind)> {
        let mut pairs: Vec<_> = self.entries.iter().map(|(k, e)| (e.order, *k)).collect();
        pairs.sort_unstable();
        pairs.into_iter().map(|(_, k)| k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.path_cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Cheapest conversion path from `from` to `to`, or `None` when the
    /// target is unreachable. `from == to` yields an empty path.
    pub fn find_path(
        &self,
        from: RepresentationKind,
        to: RepresentationKind,
    ) -> Option<ConversionPath> {
        if from == to {
            return Some(ConversionPath {
                steps: Vec::new(),
                cost: 0,
            });
        }

        let mut cache = self
            .path_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(&(from, to)) {
            return cached.clone();
        }

        let path = self.search(from, to);
        tracing::trace!(
            "Planned conversion {} -> {}: {:?}",
            from,
            to,
            path.as_ref().map(|p| &p.steps)
        );
        cache.insert((from, to), path.clone());
        path
    }

    /// Exhaustive search over simple paths; the kind graph has five nodes.
    /// Paths compare by (cost, registration orders of their edges).
    fn search(&self, from: RepresentationKind, to: RepresentationKind) -> Option<ConversionPath> {
        let mut outgoing: HashMap<RepresentationKind, Vec<(u64, RepresentationKind, u32)>> =
            HashMap::new();
        for (&(a, b), entry) in &self.entries {
            outgoing
                .entry(a)
                .or_default()
                .push((entry.order, b, entry.converter.cost()));
        }
        for edges in outgoing.values_mut() {
            edges.sort_unstable();
        }

        let mut best: Option<(u32, Vec<u64>, Vec<(RepresentationKind, RepresentationKind)>)> =
            None;
        let mut visited = [false; RepresentationKind::ALL.len()];
        visited[from.index()] = true;
        let mut orders = Vec::new();
        let mut steps = Vec::new();
        Self::walk(
            &outgoing,
            from,
            to,
            0,
            &mut visited,
            &mut orders,
            &mut steps,
            &mut best,
        );

        best.map(|(cost, _, steps)| ConversionPath { steps, cost })
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        outgoing: &HashMap<RepresentationKind, Vec<(u64, RepresentationKind, u32)>>,
        current: RepresentationKind,
        target: RepresentationKind,
        cost: u32,
        visited: &mut [bool; RepresentationKind::ALL.len()],
        orders: &mut Vec<u64>,
        steps: &mut Vec<(RepresentationKind, RepresentationKind)>,
        best: &mut Option<(u32, Vec<u64>, Vec<(RepresentationKind, RepresentationKind)>)>,
    ) {
        if current == target {
            let better = match best.as_ref() {
                None => true,
                Some((best_cost, best_orders, _)) => {
                    (cost, orders.as_slice()) < (*best_cost, best_orders.as_slice())
                }
            };
            if better {
                *best = Some((cost, orders.clone(), steps.clone()));
            }
            return;
        }
        let Some(edges) = outgoing.get(&current) else {
            return;
        };
        for &(order, next, edge_cost) in edges {
            if visited[next.index()] {
                continue;
            }
            visited[next.index()] = true;
            orders.push(order);
            steps.push((current, next));
            Self::walk(
                outgoing,
                next,
                target,
                cost.saturating_add(edge_cost),
                visited,
                orders,
                steps,
                best,
            );
            steps.pop();
            orders.pop();
            visited[next.index()] = false;
        }
    }

    /// Run a single registered hop.
    pub(crate) fn convert(
        &self,
        from: RepresentationKind,
        to: RepresentationKind,
        source: &Representation,
        destination: Option<&mut Representation>,
        descriptor: &DataDescriptor,
    ) -> DataResult<Option<Representation>> {
        let converter = self
            .converter(from, to)
            .ok_or(DataError::ConversionUnavailable { from, to })?;
        match destination {
            Some(dst) => {
                converter.update(source, dst, descriptor)?;
                Ok(None)
            }
            None => converter.create_from(source, descriptor).map(Some),
        }
    }
}
