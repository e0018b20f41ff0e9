//! Graph sources and the derived matrices a training run consumes.

use std::path::Path;

use ndarray::Array1;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::{
    Result,
    config::TrainingConfig,
    error::GcnError,
    sparse::{SparseMatrix, symmetric_normalize},
    split::{EdgeSplit, load_split, save_split, split_edges},
};

/// Supplies the undirected graph a model is trained on.
///
/// # Examples
/// ```
/// use gcnlink_core::{GraphSource, SparseMatrix};
///
/// struct Triangle;
///
/// impl GraphSource for Triangle {
///     fn name(&self) -> &str { "triangle" }
///     fn node_count(&self) -> usize { 3 }
///     fn adjacency(&self) -> gcnlink_core::Result<SparseMatrix> {
///         SparseMatrix::from_undirected_edges(3, &[(0, 1), (1, 2), (2, 0)])
///     }
/// }
///
/// let source = Triangle;
/// assert_eq!(source.adjacency()?.nnz(), 6);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
pub trait GraphSource {
    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Returns the number of nodes.
    fn node_count(&self) -> usize;

    /// Returns the symmetric `node_count × node_count` adjacency matrix.
    ///
    /// # Errors
    /// Implementations report malformed graphs as [`GcnError`] values.
    fn adjacency(&self) -> Result<SparseMatrix>;
}

/// An edge split plus the matrices derived from its training adjacency.
#[derive(Clone, Debug)]
pub struct Dataset {
    split: EdgeSplit,
    normalized_adjacency: SparseMatrix,
    features: SparseMatrix,
    labels: Array1<f32>,
    edge_mass: f64,
}

impl Dataset {
    /// Derives the normalized adjacency `D^-1/2 (A_train + I) D^-1/2`, the
    /// identity feature matrix and the flattened `A_train + I` labels.
    ///
    /// # Errors
    /// Propagates normalization failures.
    pub fn from_split(split: EdgeSplit) -> Result<Self> {
        let node_count = split.node_count();
        let with_loops = split.adj_train().add_identity()?;
        let normalized_adjacency = symmetric_normalize(&with_loops)?;
        let labels = with_loops.to_dense().iter().copied().collect();
        let edge_mass = split.adj_original().sum();
        Ok(Self {
            split,
            normalized_adjacency,
            features: SparseMatrix::identity(node_count),
            labels,
            edge_mass,
        })
    }

    /// Loads a cached split or builds a fresh one from `source`.
    ///
    /// A cache at `cache` is reused unless
    /// [`TrainingConfig::regenerate_training_data`] is set; a freshly built
    /// split is written back to `cache` when a path is given.
    ///
    /// # Errors
    /// Returns [`GcnError::SplitCache`] when the cache cannot be read or
    /// written or describes a different node count, plus any split error.
    #[instrument(
        name = "core.prepare_dataset",
        err,
        skip(source, config, cache, rng),
        fields(source = %source.name(), nodes = source.node_count()),
    )]
    pub fn prepare<S, R>(
        source: &S,
        config: &TrainingConfig,
        cache: Option<&Path>,
        rng: &mut R,
    ) -> Result<Self>
    where
        S: GraphSource + ?Sized,
        R: Rng,
    {
        let reusable = cache.filter(|path| !config.regenerate_training_data() && path.exists());
        let split = if let Some(path) = reusable {
            let split = load_split(path)?;
            if split.node_count() != source.node_count() {
                return Err(GcnError::SplitCache {
                    path: path.display().to_string().into(),
                    reason: format!(
                        "cached split has {} nodes but source `{}` has {}",
                        split.node_count(),
                        source.name(),
                        source.node_count()
                    )
                    .into(),
                });
            }
            info!(path = %path.display(), "reusing cached edge split");
            split
        } else {
            if config.regenerate_training_data() && cache.is_none() {
                warn!("regeneration requested without a cache path; the split is always fresh");
            }
            let adjacency = source.adjacency()?;
            if adjacency.rows() != source.node_count() {
                return Err(GcnError::invalid_adjacency(format!(
                    "source `{}` reports {} nodes but its adjacency has {} rows",
                    source.name(),
                    source.node_count(),
                    adjacency.rows()
                )));
            }
            let split = split_edges(&adjacency, config.split(), rng)?;
            if let Some(path) = cache {
                save_split(&split, path)?;
            }
            split
        };
        Self::from_split(split)
    }

    /// The edge split.
    #[must_use]
    pub const fn split(&self) -> &EdgeSplit {
        &self.split
    }

    /// Normalized training adjacency with self-loops.
    #[must_use]
    pub const fn normalized_adjacency(&self) -> &SparseMatrix {
        &self.normalized_adjacency
    }

    /// `N × N` identity features.
    #[must_use]
    pub const fn features(&self) -> &SparseMatrix {
        &self.features
    }

    /// Row-major flattening of `A_train + I`.
    #[must_use]
    pub const fn labels(&self) -> &Array1<f32> {
        &self.labels
    }

    /// Sum of the original adjacency, the `E` of the loss weighting.
    #[must_use]
    pub const fn edge_mass(&self) -> f64 {
        self.edge_mass
    }

    /// Number of nodes.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.split.node_count()
    }
}
