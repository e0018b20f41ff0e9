//! The epoch loop: forward pass, loss, one Adam update, validation scoring.

use std::{path::Path, time::Instant};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use tracing::{Span, debug, field, info, instrument};

use crate::{
    Result,
    config::TrainingConfig,
    dataset::{Dataset, GraphSource},
    evaluate::{LinkScores, score},
    layers::Phase,
    model::{GcnModel, ModelDimensions},
    optimizer::{Optimizer, ReconstructionLoss},
};

/// Metrics recorded after one epoch.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Cost of the epoch's forward pass, before its update.
    pub train_loss: f32,
    /// Validation ROC-AUC and average precision after the update.
    pub validation: LinkScores,
    /// Wall-clock seconds spent on the epoch.
    pub seconds: f64,
}

/// Outcome of a full training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// One entry per completed epoch.
    pub epochs: Vec<EpochReport>,
    /// Test scores of the final weights.
    pub test: LinkScores,
}

/// Runs training according to a [`TrainingConfig`].
///
/// # Examples
/// ```
/// use gcnlink_core::{GraphSource, SparseMatrix, Trainer, TrainingConfigBuilder};
///
/// struct Ring;
///
/// impl GraphSource for Ring {
///     fn name(&self) -> &str { "ring" }
///     fn node_count(&self) -> usize { 40 }
///     fn adjacency(&self) -> gcnlink_core::Result<SparseMatrix> {
///         let edges: Vec<_> = (0..40).flat_map(|n| [(n, (n + 1) % 40), (n, (n + 5) % 40)]).collect();
///         SparseMatrix::from_undirected_edges(40, &edges)
///     }
/// }
///
/// let config = TrainingConfigBuilder::new().with_epochs(3).build()?;
/// let report = Trainer::new(config).run(&Ring, None)?;
/// assert_eq!(report.epochs.len(), 3);
/// assert!((0.0..=1.0).contains(&report.test.roc_auc));
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Creates a trainer for a validated configuration.
    #[must_use]
    pub const fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Seeds the run's generator, prepares the dataset and trains on it.
    ///
    /// # Errors
    /// Propagates dataset preparation and training failures.
    #[instrument(
        name = "core.run",
        err,
        skip(self, source, cache),
        fields(source = %source.name(), seed = self.config.seed()),
    )]
    pub fn run<S>(&self, source: &S, cache: Option<&Path>) -> Result<TrainingReport>
    where
        S: GraphSource + ?Sized,
    {
        let mut rng = SmallRng::seed_from_u64(self.config.seed());
        let dataset = Dataset::prepare(source, &self.config, cache, &mut rng)?;
        self.train(&dataset, &mut rng)
    }

    /// Trains a freshly configured model on `dataset`.
    ///
    /// With zero epochs no update is applied and the report carries the
    /// test scores of the initial weights.
    ///
    /// # Errors
    /// Propagates model, loss and evaluation failures, including
    /// [`crate::GcnError::NumericalInstability`].
    #[instrument(
        name = "core.train",
        err,
        skip(self, dataset, rng),
        fields(nodes = dataset.node_count(), epochs = self.config.epochs(), final_loss = field::Empty),
    )]
    pub fn train<R: Rng>(&self, dataset: &Dataset, rng: &mut R) -> Result<TrainingReport> {
        let config = &self.config;
        let dimensions = ModelDimensions::new(
            dataset.features().cols(),
            config.hidden1().get(),
            config.hidden2().get(),
        );
        let mut model = GcnModel::configure(
            dimensions,
            dataset.normalized_adjacency().clone(),
            dataset.features().nnz(),
            config.dropout(),
            rng,
        )?;
        let loss = ReconstructionLoss::new(dataset.node_count(), dataset.edge_mass())?;
        debug!(pos_weight = loss.pos_weight(), norm = loss.norm(), "loss weighting");
        let mut optimizer = Optimizer::new(loss, config.learning_rate())?;
        let split = dataset.split();

        let mut epochs = Vec::with_capacity(config.epochs());
        for epoch in 0..config.epochs() {
            let started = Instant::now();
            let pass = model.forward(Phase::Training, dataset.features(), rng)?;
            let train_loss = optimizer.step(&mut model, &pass, dataset.labels())?;
            let embeddings = model.forward(Phase::Inference, dataset.features(), rng)?;
            let validation = score(
                embeddings.embeddings(),
                split.val_edges(),
                split.val_edges_false(),
            )?;
            let seconds = started.elapsed().as_secs_f64();
            info!(
                epoch = epoch + 1,
                train_loss,
                val_roc = validation.roc_auc,
                val_ap = validation.average_precision,
                seconds,
                "epoch complete"
            );
            record_epoch(train_loss, &validation, seconds);
            epochs.push(EpochReport {
                epoch,
                train_loss,
                validation,
                seconds,
            });
        }

        let final_pass = model.forward(Phase::Inference, dataset.features(), rng)?;
        let test = score(
            final_pass.embeddings(),
            split.test_edges(),
            split.test_edges_false(),
        )?;
        if let Some(last) = epochs.last() {
            Span::current().record("final_loss", last.train_loss);
        }
        info!(
            test_roc = test.roc_auc,
            test_ap = test.average_precision,
            "optimization finished"
        );
        Ok(TrainingReport { epochs, test })
    }
}

#[cfg(feature = "metrics")]
fn record_epoch(train_loss: f32, validation: &LinkScores, seconds: f64) {
    metrics::gauge!("gcnlink_train_loss").set(f64::from(train_loss));
    metrics::gauge!("gcnlink_val_roc").set(validation.roc_auc);
    metrics::counter!("gcnlink_epochs_total").increment(1);
    metrics::histogram!("gcnlink_epoch_seconds").record(seconds);
}

#[cfg(not(feature = "metrics"))]
fn record_epoch(_train_loss: f32, _validation: &LinkScores, _seconds: f64) {}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    use crate::{
        config::TrainingConfigBuilder,
        sparse::SparseMatrix,
        split::{SplitConfig, split_edges},
    };

    fn dataset(seed: u64) -> (Dataset, SmallRng) {
        let edges: Vec<(usize, usize)> = (0..60)
            .flat_map(|n| [(n, (n + 1) % 60), (n, (n + 3) % 60), (n, (n + 7) % 60)])
            .collect();
        let adjacency = SparseMatrix::from_undirected_edges(60, &edges).expect("in bounds");
        let mut rng = SmallRng::seed_from_u64(seed);
        let split =
            split_edges(&adjacency, &SplitConfig::default(), &mut rng).expect("split succeeds");
        (Dataset::from_split(split).expect("dataset builds"), rng)
    }

    #[rstest]
    fn reports_one_entry_per_epoch() {
        let (data, mut rng) = dataset(123);
        let config = TrainingConfigBuilder::new().with_epochs(4).build().expect("valid");
        let report = Trainer::new(config).train(&data, &mut rng).expect("training succeeds");
        assert_eq!(report.epochs.len(), 4);
        for (index, epoch) in report.epochs.iter().enumerate() {
            assert_eq!(epoch.epoch, index);
            assert!(epoch.train_loss.is_finite() && epoch.train_loss >= 0.0);
            assert!((0.0..=1.0).contains(&epoch.validation.roc_auc));
            assert!((0.0..=1.0).contains(&epoch.validation.average_precision));
            assert!(epoch.seconds >= 0.0);
        }
    }

    #[rstest]
    fn zero_epochs_score_initial_weights() {
        let config = TrainingConfigBuilder::new().with_epochs(0).build().expect("valid");
        let trainer = Trainer::new(config);
        let (data, mut rng) = dataset(7);
        let report = trainer.train(&data, &mut rng).expect("training succeeds");
        assert!(report.epochs.is_empty());

        // Rebuild the initial model with the same generator state and score it directly.
        let (data, mut rng) = dataset(7);
        let model = GcnModel::configure(
            ModelDimensions::new(60, 32, 16),
            data.normalized_adjacency().clone(),
            60,
            0.1,
            &mut rng,
        )
        .expect("valid model");
        let pass = model
            .forward(Phase::Inference, data.features(), &mut rng)
            .expect("forward succeeds");
        let expected = score(
            pass.embeddings(),
            data.split().test_edges(),
            data.split().test_edges_false(),
        )
        .expect("scores computed");
        assert_eq!(report.test, expected);
    }

    #[rstest]
    fn identical_seeds_reproduce_the_run() {
        let config = TrainingConfigBuilder::new().with_epochs(3).build().expect("valid");
        let (first_data, mut first_rng) = dataset(11);
        let (second_data, mut second_rng) = dataset(11);
        let first = Trainer::new(config).train(&first_data, &mut first_rng).expect("trains");
        let second = Trainer::new(config).train(&second_data, &mut second_rng).expect("trains");
        let losses = |report: &TrainingReport| -> Vec<f32> {
            report.epochs.iter().map(|epoch| epoch.train_loss).collect()
        };
        assert_eq!(losses(&first), losses(&second));
        assert_eq!(first.test, second.test);
    }
}
