//! Evaluation passes.
//!
//! A pass schedules every invalid processor plus everything downstream of
//! it, groups the schedule into dependency waves (Kahn's algorithm) and runs
//! the waves in order. Within a wave, sources come first, then insertion
//! order. Members of one wave never depend on each other, so with
//! `evaluation.parallel` a wave is run on scoped worker threads.

use crate::datastructures::converter::ConverterRegistry;
use crate::network::error::{ProcessorError, ProcessorResult};
use crate::network::events::NetworkEvent;
use crate::network::id::{PortId, ProcessorId};
use crate::network::port::{Port, PortData};
use crate::network::processor::{InitContext, ProcessContext};
use crate::network::processor_network::{ProcessorNetwork, ProcessorSlot, ProcessorState};
use crate::network::property::InvalidationLevel;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Why a scheduled processor was not processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `initialize` failed when the processor was added.
    InitializationFailed(String),
    /// The named upstream processor is still invalid.
    UpstreamInvalid(String),
    /// The named inport is unconnected or waiting for data.
    InportsNotReady(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InitializationFailed(message) => {
                write!(f, "initialization failed: {message}")
            }
            SkipReason::UpstreamInvalid(upstream) => write!(f, "upstream {upstream} is invalid"),
            SkipReason::InportsNotReady(port) => write!(f, "inport {port} is not ready"),
        }
    }
}

/// Outcome of one evaluation pass.
#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub pass: u64,
    /// Processed successfully, in evaluation order.
    pub processed: Vec<String>,
    pub failed: Vec<(String, ProcessorError)>,
    pub skipped: Vec<(String, SkipReason)>,
    pub duration: Duration,
}

impl EvaluationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn was_processed(&self, identifier: &str) -> bool {
        self.processed.iter().any(|p| p == identifier)
    }

    pub fn failure(&self, identifier: &str) -> Option<&ProcessorError> {
        self.failed
            .iter()
            .find(|(p, _)| p == identifier)
            .map(|(_, e)| e)
    }

    pub fn skip_reason(&self, identifier: &str) -> Option<&SkipReason> {
        self.skipped
            .iter()
            .find(|(p, _)| p == identifier)
            .map(|(_, r)| r)
    }
}

/// Input snapshot of one processor, indexed like its ports.
struct Job {
    id: ProcessorId,
    inputs: Vec<Vec<PortData>>,
    changed: Vec<bool>,
}

type JobOutcome = (ProcessorId, ProcessorResult<Vec<Option<PortData>>>);

/// Run one processor against its input snapshot.
fn run_job(
    slot: &mut ProcessorSlot,
    job: &Job,
    registry: &ConverterRegistry,
) -> ProcessorResult<Vec<Option<PortData>>> {
    if slot.invalidation == InvalidationLevel::InvalidResources {
        let ctx = InitContext::new(&slot.identifier, &slot.properties, registry);
        slot.processor.initialize_resources(&ctx)?;
        slot.invalidation = InvalidationLevel::InvalidOutput;
    }
    let mut ctx = ProcessContext::new(
        &slot.identifier,
        &slot.descriptors,
        &job.inputs,
        &job.changed,
        &slot.properties,
        registry,
    );
    slot.processor.process(&mut ctx)?;
    Ok(ctx.into_outputs())
}

/// `run_job`, with a panic reported as `ProcessingFailed`.
fn run_job_isolated(
    slot: &mut ProcessorSlot,
    job: &Job,
    registry: &ConverterRegistry,
) -> ProcessorResult<Vec<Option<PortData>>> {
    panic::catch_unwind(AssertUnwindSafe(|| run_job(slot, job, registry))).unwrap_or_else(
        |payload| Err(ProcessorError::processing(panic_message(payload.as_ref()))),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "processor panicked".to_string())
}

impl ProcessorNetwork {
    /// Run one evaluation pass.
    ///
    /// Failures do not abort the pass: a failing processor stays invalid and
    /// its downstream subtree is skipped, everything else proceeds.
    pub fn evaluate(&mut self) -> EvaluationReport {
        let start = Instant::now();
        self.pass += 1;
        let mut report = EvaluationReport {
            pass: self.pass,
            ..Default::default()
        };

        let waves = self.schedule();
        tracing::debug!(
            "Pass {}: {} processors in {} waves",
            self.pass,
            waves.iter().map(Vec::len).sum::<usize>(),
            waves.len()
        );

        for wave in waves {
            let mut jobs = Vec::with_capacity(wave.len());
            for id in wave {
                match self.prepare(id) {
                    Ok(job) => jobs.push(job),
                    Err(reason) => {
                        let identifier = self.identifier_of(id);
                        tracing::warn!("Skipped {}: {}", identifier, reason);
                        report.skipped.push((identifier, reason));
                    }
                }
            }

            let outcomes = if self.settings.parallel && jobs.len() > 1 {
                self.run_parallel(&jobs)
            } else {
                self.run_sequential(&jobs)
            };
            for (id, outcome) in outcomes {
                self.apply(id, outcome, &mut report);
            }
        }

        report.duration = start.elapsed();
        tracing::info!(
            "Pass {} finished in {:?}: {} processed, {} failed, {} skipped",
            report.pass,
            report.duration,
            report.processed.len(),
            report.failed.len(),
            report.skipped.len()
        );
        self.observers.emit(NetworkEvent::EvaluationFinished {
            pass: report.pass,
            processed: report.processed.len(),
            failed: report.failed.len(),
        });
        report
    }

    /// Evaluation order: the invalid processors and their downstream closure,
    /// as dependency waves.
    pub fn schedule(&self) -> Vec<Vec<ProcessorId>> {
        let invalid: Vec<ProcessorId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref()
                    .filter(|s| s.invalidation != InvalidationLevel::Valid)
                    .map(|_| ProcessorId(index as u32))
            })
            .collect();
        let scheduled = self.downstream_closure(&invalid);

        let n = self.slots.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for c in &self.connections {
            let from = c.outport.processor().index();
            let to = c.inport.processor().index();
            if scheduled[from] && scheduled[to] {
                adj[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut wave: Vec<usize> = (0..n)
            .filter(|&i| scheduled[i] && self.slots[i].is_some() && in_degree[i] == 0)
            .collect();
        let mut waves = Vec::new();
        while !wave.is_empty() {
            wave.sort_by_key(|&i| (!self.is_source_index(i), i));
            let mut next = Vec::new();
            for &node in &wave {
                for &to in &adj[node] {
                    in_degree[to] -= 1;
                    if in_degree[to] == 0 {
                        next.push(to);
                    }
                }
            }
            waves.push(wave.iter().map(|&i| ProcessorId(i as u32)).collect());
            wave = next;
        }
        waves
    }

    /// Flattened evaluation order, by identifier.
    pub fn evaluation_order(&self) -> Vec<String> {
        self.schedule()
            .into_iter()
            .flatten()
            .map(|id| self.identifier_of(id))
            .collect()
    }

    fn is_source_index(&self, index: usize) -> bool {
        self.slots[index]
            .as_ref()
            .is_some_and(|slot| slot.processor.is_source())
    }

    fn identifier_of(&self, id: ProcessorId) -> String {
        self.slot(id)
            .map(|slot| slot.identifier.clone())
            .unwrap_or_else(|_| id.to_string())
    }

    /// Check that `id` can run and snapshot its inputs.
    fn prepare(&self, id: ProcessorId) -> Result<Job, SkipReason> {
        let slot = self
            .slot(id)
            .map_err(|e| SkipReason::InitializationFailed(e.to_string()))?;
        if let ProcessorState::InitializationFailed(message) = &slot.state {
            return Err(SkipReason::InitializationFailed(message.clone()));
        }

        if let Some(upstream) = self.upstream_of(id).find(|&up| {
            self.slot(up)
                .map_or(true, |s| s.invalidation != InvalidationLevel::Valid)
        }) {
            return Err(SkipReason::UpstreamInvalid(self.identifier_of(upstream)));
        }

        if let Some(port) = slot.inports().find(|p| !self.inport_ready(p)) {
            return Err(SkipReason::InportsNotReady(format!(
                "{}.{}",
                slot.identifier, port.descriptor.identifier
            )));
        }

        let (inputs, changed): (Vec<Vec<PortData>>, Vec<bool>) = slot
            .ports
            .iter()
            .map(|port| match port {
                Port::In(inport) => (self.gather_inputs(inport), inport.changed),
                Port::Out(_) => (Vec::new(), false),
            })
            .unzip();
        Ok(Job {
            id,
            inputs,
            changed,
        })
    }

    fn run_sequential(&mut self, jobs: &[Job]) -> Vec<JobOutcome> {
        let registry = self.context.converters();
        jobs.iter()
            .filter_map(|job| {
                let slot = self.slots.get_mut(job.id.index())?.as_mut()?;
                Some((job.id, run_job_isolated(slot, job, registry)))
            })
            .collect()
    }

    fn run_parallel(&mut self, jobs: &[Job]) -> Vec<JobOutcome> {
        let registry = self.context.converters();
        let by_index: HashMap<usize, &Job> = jobs.iter().map(|j| (j.id.index(), j)).collect();
        let mut work: Vec<(&mut ProcessorSlot, &Job)> = self
            .slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| Some((slot.as_mut()?, *by_index.get(&index)?)))
            .collect();

        let max_threads = self.settings.max_threads.max(1);
        let mut outcomes = Vec::with_capacity(work.len());
        for chunk in work.chunks_mut(max_threads) {
            std::thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter_mut()
                    .map(|(slot, job)| {
                        let id = job.id;
                        let handle = scope.spawn(move || run_job(slot, job, registry));
                        (id, handle)
                    })
                    .collect();
                for (id, handle) in handles {
                    let outcome = handle.join().unwrap_or_else(|payload| {
                        Err(ProcessorError::processing(panic_message(payload.as_ref())))
                    });
                    outcomes.push((id, outcome));
                }
            });
        }

        // Report in schedule order.
        let position: HashMap<ProcessorId, usize> =
            jobs.iter().enumerate().map(|(i, j)| (j.id, i)).collect();
        outcomes.sort_by_key(|(id, _)| position.get(id).copied().unwrap_or(usize::MAX));
        outcomes
    }

    fn apply(
        &mut self,
        id: ProcessorId,
        outcome: ProcessorResult<Vec<Option<PortData>>>,
        report: &mut EvaluationReport,
    ) {
        let Some(slot) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
            return;
        };
        let identifier = slot.identifier.clone();
        match outcome {
            Ok(outputs) => {
                slot.invalidation = InvalidationLevel::Valid;
                slot.last_error = None;
                for port in slot.ports.iter_mut() {
                    if let Port::In(inport) = port {
                        inport.changed = false;
                    }
                }
                for (index, data) in outputs.into_iter().enumerate() {
                    if let Some(data) = data {
                        self.publish(PortId::new(id, index as u16), data);
                    }
                }
                tracing::trace!("Processed {}", identifier);
                report.processed.push(identifier);
            }
            Err(e) => {
                tracing::error!("Processor {} failed: {}", identifier, e);
                slot.last_error = Some(e.to_string());
                self.observers.emit(NetworkEvent::ProcessorFailed {
                    identifier: identifier.clone(),
                    message: e.to_string(),
                });
                report.failed.push((identifier, e));
            }
        }
    }
}
