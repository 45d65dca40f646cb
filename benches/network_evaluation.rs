//! Benchmarks for network evaluation and representation conversion
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use visnet::config::EvaluationSettings;
use visnet::datastructures::{BufferType, Data, DataFormat, RamStorage, RepresentationKind};
use visnet::network::processors::{BufferScale, BufferSource, BufferStatistics};
use visnet::network::{InvalidationLevel, PropertyValue};
use visnet::{ApplicationContext, ProcessorNetwork};

/// `branches` independent source -> scale -> stats chains.
fn fan_network(branches: usize, len: usize, settings: EvaluationSettings) -> ProcessorNetwork {
    let context = Arc::new(ApplicationContext::with_default_modules("bench"));
    let mut net = ProcessorNetwork::new(context, settings);
    let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
    for b in 0..branches {
        let source = format!("source{b}");
        let scale = format!("scale{b}");
        let stats = format!("stats{b}");
        net.add_processor(source.as_str(), BufferSource).unwrap();
        net.add_processor(scale.as_str(), BufferScale::default())
            .unwrap();
        net.add_processor(stats.as_str(), BufferStatistics::default())
            .unwrap();
        net.connect(&source, "outport", &scale, "inport").unwrap();
        net.connect(&scale, "outport", &stats, "inport").unwrap();
        net.set_property(&source, "values", PropertyValue::FloatList(values.clone()))
            .unwrap();
    }
    net
}

fn bench_full_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_evaluation");

    for branches in [1, 8, 32].iter() {
        group.throughput(Throughput::Elements((*branches * 3) as u64));
        for (name, settings) in [
            ("sequential", EvaluationSettings::default()),
            ("parallel", EvaluationSettings::parallel(4)),
        ] {
            group.bench_with_input(BenchmarkId::new(name, branches), branches, |b, &branches| {
                let mut net = fan_network(branches, 4096, settings.clone());
                b.iter(|| {
                    for branch in 0..branches {
                        net.invalidate(&format!("source{branch}"), InvalidationLevel::InvalidOutput)
                            .unwrap();
                    }
                    black_box(net.evaluate())
                });
            });
        }
    }

    group.finish();
}

fn bench_incremental_evaluation(c: &mut Criterion) {
    let mut net = fan_network(32, 4096, EvaluationSettings::default());
    net.evaluate();
    let mut factor = 1.0;

    c.bench_function("incremental_single_branch", |b| {
        b.iter(|| {
            factor += 0.5;
            net.set_property("scale7", "factor", PropertyValue::Float(factor))
                .unwrap();
            black_box(net.evaluate())
        });
    });
}

fn bench_scheduling(c: &mut Criterion) {
    let net = fan_network(64, 16, EvaluationSettings::default());

    c.bench_function("schedule_192_processors", |b| {
        b.iter(|| black_box(net.schedule()));
    });
}

fn bench_representation_round_trip(c: &mut Criterion) {
    let context = ApplicationContext::with_default_modules("bench");
    let registry = context.converters();
    let mut group = c.benchmark_group("representation_round_trip");

    for len in [1024usize, 65_536, 1_048_576].iter() {
        group.throughput(Throughput::Bytes((*len * 4) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let mut data = Data::buffer(
                BufferType::Position,
                DataFormat::FLOAT32,
                RamStorage::Float32(vec![1.0; len]),
            )
            .unwrap();
            b.iter(|| {
                data.get_editable_representation(RepresentationKind::Ram, registry)
                    .unwrap();
                black_box(
                    data.get_representation(RepresentationKind::ClGl, registry)
                        .unwrap()
                        .size_in_bytes(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_evaluation,
    bench_incremental_evaluation,
    bench_scheduling,
    bench_representation_round_trip
);
criterion_main!(benches);
