use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use ttreco::{
    data::test_event, CombinationEnumerator, CombinationFeatureExtractor, EventProcessor,
    NeutrinoReconstructor, ObjectSelector, ProcessorOptions, RawEvent, RawJet, TruthMatcher,
    TruthDecayClassifier,
};

fn jittered_events(n: usize, extra_jets: usize, seed: u64) -> Vec<RawEvent> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..n)
        .map(|_| {
            let mut event = test_event();
            for jet in event.jets.iter_mut() {
                jet.pt *= 0.9 + 0.2 * rng.f64();
                jet.phi += 0.01 * (rng.f64() - 0.5);
            }
            for _ in 0..extra_jets {
                event.jets.push(RawJet::new(
                    20.0 + 60.0 * rng.f64(),
                    4.0 * rng.f64() - 2.0,
                    6.0 * rng.f64() - 3.0,
                    5.0,
                    21,
                ));
            }
            event
        })
        .collect()
}

fn combination_features_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Combination Features");
    for extra_jets in [0, 1, 2] {
        let event = &jittered_events(1, extra_jets, 0)[0];
        let mut objects = ObjectSelector::default().select(event).unwrap();
        let lepton = objects.lepton(0).unwrap().p4;
        let met = objects.missing_energy().unwrap().p4;
        let solutions = NeutrinoReconstructor::default().solve(&lepton, &met);
        objects.set_neutrinos(solutions.p4s(), solutions.solved);
        let truth = TruthDecayClassifier::default().classify(&event.truth).unwrap();
        let matches = TruthMatcher::default().match_objects(&objects, &truth.particles);
        let enumerator = CombinationEnumerator::default();
        group.bench_with_input(
            BenchmarkId::from_parameter(objects.n_jets()),
            &objects,
            |b, objects| {
                let mut extractor = CombinationFeatureExtractor::new();
                b.iter(|| {
                    for combination in enumerator.enumerate(objects, &matches) {
                        black_box(extractor.fill(0, &combination, objects).unwrap());
                    }
                })
            },
        );
    }
    group.finish();
}

fn processor_benchmark(c: &mut Criterion) {
    let events = jittered_events(200, 1, 1);
    let mut group = c.benchmark_group("Event Processing");
    group.bench_function("sequential", |b| {
        b.iter_batched(
            || EventProcessor::new(ProcessorOptions::default()),
            |mut processor| black_box(processor.process_events(&events, 0).unwrap()),
            BatchSize::SmallInput,
        )
    });
    for partitions in [2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("partitioned", partitions),
            &partitions,
            |b, &partitions| {
                b.iter_batched(
                    || EventProcessor::new(ProcessorOptions::default()),
                    |mut processor| {
                        black_box(processor.process_partitioned(&events, partitions).unwrap())
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = combination_features_benchmark, processor_benchmark
}
criterion_main!(benches);
