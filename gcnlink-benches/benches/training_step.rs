//! Training step benchmarks.
//!
//! Measures one dropout forward pass followed by the loss gradient and a
//! single Adam update, and separately the inference forward pass used for
//! scoring.
#![expect(
    missing_docs,
    reason = "Criterion macros generate items without doc comments"
)]
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::SmallRng};

use gcnlink_benches::{
    error::BenchSetupError,
    params::GraphBenchParams,
    source::{BlockModelConfig, SyntheticGraph},
};
use gcnlink_core::{
    Dataset, GcnModel, ModelDimensions, Optimizer, Phase, ReconstructionLoss, SplitConfig,
    TrainingConfig, split_edges,
};

const SEED: u64 = 123;
const COMMUNITIES: usize = 4;
const DEGREE: f64 = 8.0;
const NODE_COUNTS: &[usize] = &[250, 1_000];

struct Fixture {
    dataset: Dataset,
    model: GcnModel,
    optimizer: Optimizer,
    rng: SmallRng,
}

fn fixture(node_count: usize) -> Result<Fixture, BenchSetupError> {
    let graph = SyntheticGraph::generate(&BlockModelConfig::with_expected_degree(
        node_count,
        COMMUNITIES,
        DEGREE,
        SEED,
    ))?;
    let mut rng = SmallRng::seed_from_u64(SEED);
    let adjacency = gcnlink_core::GraphSource::adjacency(&graph)?;
    let split = split_edges(&adjacency, &SplitConfig::default(), &mut rng)?;
    let dataset = Dataset::from_split(split)?;
    let config = TrainingConfig::default();
    let model = GcnModel::configure(
        ModelDimensions::new(
            dataset.features().cols(),
            config.hidden1().get(),
            config.hidden2().get(),
        ),
        dataset.normalized_adjacency().clone(),
        dataset.features().nnz(),
        config.dropout(),
        &mut rng,
    )?;
    let loss = ReconstructionLoss::new(dataset.node_count(), dataset.edge_mass())?;
    let optimizer = Optimizer::new(loss, config.learning_rate())?;
    Ok(Fixture {
        dataset,
        model,
        optimizer,
        rng,
    })
}

fn training_step_impl(c: &mut Criterion) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group("training_step");
    group.sample_size(10);

    for &node_count in NODE_COUNTS {
        let params = GraphBenchParams {
            node_count,
            communities: COMMUNITIES,
        };
        let mut state = fixture(node_count)?;
        group.bench_function(BenchmarkId::new("train", params), |b| {
            b.iter(|| {
                let Fixture {
                    dataset,
                    model,
                    optimizer,
                    rng,
                } = &mut state;
                model
                    .forward(Phase::Training, dataset.features(), rng)
                    .and_then(|pass| optimizer.step(model, &pass, dataset.labels()))
            });
        });

        let mut inference = fixture(node_count)?;
        group.bench_function(BenchmarkId::new("inference", params), |b| {
            b.iter(|| {
                inference
                    .model
                    .forward(Phase::Inference, inference.dataset.features(), &mut inference.rng)
            });
        });
    }

    group.finish();
    Ok(())
}

fn training_step(c: &mut Criterion) {
    if let Err(err) = training_step_impl(c) {
        panic!("training_step benchmark setup failed: {err}");
    }
}

criterion_group!(benches, training_step);
criterion_main!(benches);
