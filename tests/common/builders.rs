//! Test processors and network builders

use std::sync::{Arc, Mutex};
use visnet::config::EvaluationSettings;
use visnet::datastructures::{BufferType, Data, DataFormat, DataRef, RamStorage, RepresentationKind};
use visnet::network::{
    AnyProcessor, CodeState, InitContext, PortDescriptor, PortType, ProcessContext, Processor,
    ProcessorError, ProcessorInfo, ProcessorResult,
};
use visnet::ProcessorNetwork;

const RECORDER_PORTS: [PortDescriptor; 2] = [
    PortDescriptor::multi_input("inport", PortType::Buffer).optional(),
    PortDescriptor::output("outport", PortType::Buffer),
];

/// Shared record of which processors ran, in the order they ran
#[derive(Debug, Clone, Default)]
pub struct ProcessLog(Arc<Mutex<Vec<String>>>);

impl ProcessLog {
    pub fn record(&self, identifier: &str) {
        self.0.lock().unwrap().push(identifier.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Processor that logs every `process` call and emits a one-element buffer
/// holding 1 plus the sum of every input scalar. Its multi inport is
/// optional, so it runs as a root too.
#[derive(Debug)]
pub struct RecordingProcessor {
    log: ProcessLog,
    fail_initialize: bool,
    fail_process: bool,
    panic_process: bool,
}

impl RecordingProcessor {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "test.Recording",
        display_name: "Recording",
        category: "Test",
        code_state: CodeState::Experimental,
        tags: &[],
    };

    pub fn new(log: &ProcessLog) -> Self {
        Self {
            log: log.clone(),
            fail_initialize: false,
            fail_process: false,
            panic_process: false,
        }
    }

    /// A recorder whose `process` always returns `ProcessingFailed`
    pub fn failing(log: &ProcessLog) -> Self {
        Self {
            fail_process: true,
            ..Self::new(log)
        }
    }

    /// A recorder whose `process` panics
    pub fn panicking(log: &ProcessLog) -> Self {
        Self {
            panic_process: true,
            ..Self::new(log)
        }
    }

    /// A recorder whose `initialize` fails
    pub fn broken(log: &ProcessLog) -> Self {
        Self {
            fail_initialize: true,
            ..Self::new(log)
        }
    }
}

impl Processor for RecordingProcessor {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &RECORDER_PORTS
    }

    fn initialize(&mut self, ctx: &InitContext) -> ProcessorResult<()> {
        if self.fail_initialize {
            return Err(ProcessorError::ResourceAcquisitionFailed(format!(
                "{} has no resources",
                ctx.identifier()
            )));
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        self.log.record(ctx.identifier());
        if self.panic_process {
            panic!("{} panicked on purpose", ctx.identifier());
        }
        if self.fail_process {
            return Err(ProcessorError::processing(format!(
                "{} failed on purpose",
                ctx.identifier()
            )));
        }

        let mut total = 1.0;
        for input in ctx.inputs("inport")? {
            let data = input
                .as_data()
                .ok_or_else(|| ProcessorError::processing("expected a buffer"))?;
            let mut guard = data.lock();
            let rep = guard.get_representation(RepresentationKind::Ram, ctx.registry())?;
            total += rep.expect_ram()?.to_f64_vec().iter().sum::<f64>();
        }

        let data = Data::buffer(
            BufferType::Position,
            DataFormat::FLOAT32,
            RamStorage::Float32(vec![total as f32]),
        )?;
        ctx.set_output("outport", DataRef::new(data))
    }
}

/// Builder for networks of recording processors
pub struct NetworkBuilder {
    network: ProcessorNetwork,
    log: ProcessLog,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::with_settings(EvaluationSettings::default())
    }

    pub fn parallel(max_threads: usize) -> Self {
        Self::with_settings(EvaluationSettings::parallel(max_threads))
    }

    pub fn with_settings(settings: EvaluationSettings) -> Self {
        Self {
            network: ProcessorNetwork::new(super::test_context(), settings),
            log: ProcessLog::default(),
        }
    }

    pub fn recorder(self, identifier: &str) -> Self {
        let processor = RecordingProcessor::new(&self.log);
        self.processor(identifier, AnyProcessor::plugin(processor))
    }

    pub fn failing(self, identifier: &str) -> Self {
        let processor = RecordingProcessor::failing(&self.log);
        self.processor(identifier, AnyProcessor::plugin(processor))
    }

    pub fn panicking(self, identifier: &str) -> Self {
        let processor = RecordingProcessor::panicking(&self.log);
        self.processor(identifier, AnyProcessor::plugin(processor))
    }

    pub fn broken(self, identifier: &str) -> Self {
        let processor = RecordingProcessor::broken(&self.log);
        self.processor(identifier, AnyProcessor::plugin(processor))
    }

    pub fn processor(mut self, identifier: &str, processor: impl Into<AnyProcessor>) -> Self {
        self.network.add_processor(identifier, processor).unwrap();
        self
    }

    /// Connect `from.outport` to `to.inport`
    pub fn connect(mut self, from: &str, to: &str) -> Self {
        self.network
            .connect(from, "outport", to, "inport")
            .unwrap();
        self
    }

    pub fn build(self) -> (ProcessorNetwork, ProcessLog) {
        (self.network, self.log)
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
