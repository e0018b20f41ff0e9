//! Training hyperparameters and their validation.
//!
//! [`TrainingConfigBuilder`] collects overrides and [`TrainingConfigBuilder::build`]
//! rejects invalid combinations before any data is touched.

use std::num::NonZeroUsize;

use crate::{Result, error::GcnError, layers::validate_dropout, split::SplitConfig};

/// Seed used when none is supplied.
pub const DEFAULT_SEED: u64 = 123;

/// Validated hyperparameters for a training run.
///
/// # Examples
/// ```
/// use gcnlink_core::TrainingConfig;
///
/// let config = TrainingConfig::default();
/// assert_eq!(config.epochs(), 20);
/// assert_eq!(config.hidden1().get(), 32);
/// assert_eq!(config.hidden2().get(), 16);
/// assert_eq!(config.seed(), 123);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingConfig {
    learning_rate: f32,
    epochs: usize,
    hidden1: NonZeroUsize,
    hidden2: NonZeroUsize,
    dropout: f32,
    seed: u64,
    regenerate_training_data: bool,
    split: SplitConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            epochs: 20,
            hidden1: NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN),
            hidden2: NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN),
            dropout: 0.1,
            seed: DEFAULT_SEED,
            regenerate_training_data: false,
            split: SplitConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Returns a builder seeded with the defaults.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::new()
    }

    /// Adam learning rate.
    #[rustfmt::skip]
    #[must_use]
    pub const fn learning_rate(&self) -> f32 { self.learning_rate }

    /// Number of training epochs; zero skips training entirely.
    #[rustfmt::skip]
    #[must_use]
    pub const fn epochs(&self) -> usize { self.epochs }

    /// Width of the first convolution.
    #[rustfmt::skip]
    #[must_use]
    pub const fn hidden1(&self) -> NonZeroUsize { self.hidden1 }

    /// Embedding width.
    #[rustfmt::skip]
    #[must_use]
    pub const fn hidden2(&self) -> NonZeroUsize { self.hidden2 }

    /// Dropout rate during training.
    #[rustfmt::skip]
    #[must_use]
    pub const fn dropout(&self) -> f32 { self.dropout }

    /// Seed of the run's random generator.
    #[rustfmt::skip]
    #[must_use]
    pub const fn seed(&self) -> u64 { self.seed }

    /// Whether a cached edge split is ignored and rebuilt.
    #[rustfmt::skip]
    #[must_use]
    pub const fn regenerate_training_data(&self) -> bool { self.regenerate_training_data }

    /// Edge split fractions.
    #[rustfmt::skip]
    #[must_use]
    pub const fn split(&self) -> &SplitConfig { &self.split }
}

/// Collects overrides for a [`TrainingConfig`].
///
/// # Examples
/// ```
/// use gcnlink_core::TrainingConfigBuilder;
///
/// let config = TrainingConfigBuilder::new()
///     .with_epochs(5)
///     .with_hidden1(8)
///     .with_dropout(0.0)
///     .build()?;
/// assert_eq!(config.epochs(), 5);
/// assert_eq!(config.hidden1().get(), 8);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
#[derive(Clone, Debug)]
pub struct TrainingConfigBuilder {
    learning_rate: f32,
    epochs: usize,
    hidden1: usize,
    hidden2: usize,
    dropout: f32,
    seed: u64,
    regenerate_training_data: bool,
    split: SplitConfig,
}

impl Default for TrainingConfigBuilder {
    fn default() -> Self {
        let defaults = TrainingConfig::default();
        Self {
            learning_rate: defaults.learning_rate,
            epochs: defaults.epochs,
            hidden1: defaults.hidden1.get(),
            hidden2: defaults.hidden2.get(),
            dropout: defaults.dropout,
            seed: defaults.seed,
            regenerate_training_data: defaults.regenerate_training_data,
            split: defaults.split,
        }
    }
}

impl TrainingConfigBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Overrides the number of epochs.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Overrides the first hidden width.
    #[must_use]
    pub fn with_hidden1(mut self, hidden1: usize) -> Self {
        self.hidden1 = hidden1;
        self
    }

    /// Overrides the embedding width.
    #[must_use]
    pub fn with_hidden2(mut self, hidden2: usize) -> Self {
        self.hidden2 = hidden2;
        self
    }

    /// Overrides the dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Overrides the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Forces a fresh edge split even when a cache exists.
    #[must_use]
    pub fn with_regenerate_training_data(mut self, regenerate: bool) -> Self {
        self.regenerate_training_data = regenerate;
        self
    }

    /// Overrides the validation fraction.
    #[must_use]
    pub fn with_val_fraction(mut self, fraction: f64) -> Self {
        self.split = self.split.with_val_fraction(fraction);
        self
    }

    /// Overrides the test fraction.
    #[must_use]
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.split = self.split.with_test_fraction(fraction);
        self
    }

    /// Replaces the whole split configuration.
    #[must_use]
    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidConfiguration`] naming the first invalid
    /// field.
    pub fn build(self) -> Result<TrainingConfig> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(GcnError::invalid_configuration(
                "learning_rate",
                format!("must be finite and positive (got {})", self.learning_rate),
            ));
        }
        let hidden1 = NonZeroUsize::new(self.hidden1)
            .ok_or_else(|| GcnError::invalid_configuration("hidden1", "must be at least 1"))?;
        let hidden2 = NonZeroUsize::new(self.hidden2)
            .ok_or_else(|| GcnError::invalid_configuration("hidden2", "must be at least 1"))?;
        validate_dropout(self.dropout)?;
        self.split.validate()?;
        Ok(TrainingConfig {
            learning_rate: self.learning_rate,
            epochs: self.epochs,
            hidden1,
            hidden2,
            dropout: self.dropout,
            seed: self.seed,
            regenerate_training_data: self.regenerate_training_data,
            split: self.split,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn builder_defaults_match_config_defaults() {
        let built = TrainingConfigBuilder::new().build().expect("defaults are valid");
        assert_eq!(built, TrainingConfig::default());
        assert!((built.learning_rate() - 0.01).abs() < f32::EPSILON);
        assert!((built.dropout() - 0.1).abs() < f32::EPSILON);
        assert!(!built.regenerate_training_data());
    }

    #[rstest]
    #[case::zero_rate(TrainingConfigBuilder::new().with_learning_rate(0.0), "learning_rate")]
    #[case::nan_rate(TrainingConfigBuilder::new().with_learning_rate(f32::NAN), "learning_rate")]
    #[case::zero_hidden1(TrainingConfigBuilder::new().with_hidden1(0), "hidden1")]
    #[case::zero_hidden2(TrainingConfigBuilder::new().with_hidden2(0), "hidden2")]
    #[case::full_dropout(TrainingConfigBuilder::new().with_dropout(1.0), "dropout")]
    #[case::negative_dropout(TrainingConfigBuilder::new().with_dropout(-0.5), "dropout")]
    #[case::val_fraction(TrainingConfigBuilder::new().with_val_fraction(1.5), "val_fraction")]
    fn invalid_values_are_rejected(#[case] builder: TrainingConfigBuilder, #[case] field: &str) {
        match builder.build() {
            Err(GcnError::InvalidConfiguration { parameter, .. }) => assert_eq!(parameter, field),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[rstest]
    fn zero_epochs_are_accepted() {
        let config = TrainingConfigBuilder::new().with_epochs(0).build().expect("valid");
        assert_eq!(config.epochs(), 0);
    }
}
