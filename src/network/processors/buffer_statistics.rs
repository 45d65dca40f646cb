use crate::datastructures::representation::RepresentationKind;
use crate::network::error::ProcessorResult;
use crate::network::port::{PortDescriptor, PortType};
use crate::network::processor::{CodeState, ProcessContext, Processor, ProcessorInfo};

const PORTS: [PortDescriptor; 1] = [PortDescriptor::input("inport", PortType::Buffer)];

/// Summary of the last processed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Statistics {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        Self {
            count: values.len(),
            min,
            max,
            mean: sum / values.len() as f64,
        }
    }
}

/// Sink that computes scalar statistics of its input buffer.
#[derive(Debug, Default)]
pub struct BufferStatistics {
    last: Option<Statistics>,
    runs: u64,
}

impl BufferStatistics {
    pub const INFO: ProcessorInfo = ProcessorInfo {
        class_identifier: "org.visnet.BufferStatistics",
        display_name: "Buffer Statistics",
        category: "Information",
        code_state: CodeState::Stable,
        tags: &["CPU"],
    };

    pub fn statistics(&self) -> Option<&Statistics> {
        self.last.as_ref()
    }

    /// Number of successful `process` calls.
    pub fn runs(&self) -> u64 {
        self.runs
    }
}

impl Processor for BufferStatistics {
    fn info(&self) -> ProcessorInfo {
        Self::INFO
    }

    fn ports(&self) -> &[PortDescriptor] {
        &PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> ProcessorResult<()> {
        let mut data = ctx.input_data("inport")?.lock();
        let values = data
            .get_representation(RepresentationKind::Ram, ctx.registry())?
            .expect_ram()?
            .to_f64_vec();
        let stats = Statistics::from_values(&values);
        tracing::debug!(
            "{}: count={} min={} max={} mean={}",
            ctx.identifier(),
            stats.count,
            stats.min,
            stats.max,
            stats.mean
        );
        self.last = Some(stats);
        self.runs += 1;
        Ok(())
    }

    fn deinitialize(&mut self) {
        self.last = None;
    }
}
