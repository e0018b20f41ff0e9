//! Train/validation/test partitioning of an undirected edge set.
//!
//! Positive held-out edges are sliced from a shuffled list of the graph's
//! upper-triangular edges and removed (in both directions) from the training
//! adjacency. Negative edges are drawn by bounded rejection sampling of
//! unordered node pairs that are not edges of the original graph.

mod cache;

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{Result, error::GcnError, sparse::SparseMatrix};

pub use self::cache::{SplitCache, load_split, save_split};

/// An ordered node pair `(source, target)` with `source != target`.
///
/// # Examples
/// ```
/// use gcnlink_core::Edge;
///
/// let edge = Edge::new(4, 1);
/// assert_eq!(edge.source(), 4);
/// assert_eq!(edge.canonical(), (1, 4));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    source: usize,
    target: usize,
}

impl Edge {
    /// Creates an edge between `source` and `target`.
    #[rustfmt::skip]
    #[must_use]
    pub const fn new(source: usize, target: usize) -> Self { Self { source, target } }

    /// Returns the first endpoint.
    #[rustfmt::skip]
    #[must_use]
    pub const fn source(&self) -> usize { self.source }

    /// Returns the second endpoint.
    #[rustfmt::skip]
    #[must_use]
    pub const fn target(&self) -> usize { self.target }

    /// Returns the endpoints as `(smaller, larger)`.
    #[must_use]
    pub const fn canonical(&self) -> (usize, usize) {
        if self.source <= self.target {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }
}

impl From<(usize, usize)> for Edge {
    fn from((source, target): (usize, usize)) -> Self {
        Self::new(source, target)
    }
}

/// Fractions and sampling budget used by [`split_edges`].
///
/// # Examples
/// ```
/// use gcnlink_core::SplitConfig;
///
/// let config = SplitConfig::default();
/// assert_eq!(config.val_fraction(), 0.05);
/// assert_eq!(config.test_fraction(), 0.10);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitConfig {
    val_fraction: f64,
    test_fraction: f64,
    attempts_per_negative: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            val_fraction: 0.05,
            test_fraction: 0.10,
            attempts_per_negative: 1_000,
        }
    }
}

impl SplitConfig {
    /// Overrides the fraction of edges held out for validation.
    #[must_use]
    pub const fn with_val_fraction(mut self, fraction: f64) -> Self {
        self.val_fraction = fraction;
        self
    }

    /// Overrides the fraction of edges held out for testing.
    #[must_use]
    pub const fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Overrides how many draws each requested negative edge may consume
    /// before sampling gives up.
    #[must_use]
    pub const fn with_attempts_per_negative(mut self, attempts: usize) -> Self {
        self.attempts_per_negative = attempts;
        self
    }

    /// Returns the validation fraction.
    #[must_use]
    pub const fn val_fraction(&self) -> f64 {
        self.val_fraction
    }

    /// Returns the test fraction.
    #[must_use]
    pub const fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Returns the per-negative sampling budget.
    #[must_use]
    pub const fn attempts_per_negative(&self) -> usize {
        self.attempts_per_negative
    }

    /// Checks that both fractions lie in `(0, 1)` and leave room for
    /// training edges.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidConfiguration`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        for (parameter, fraction) in [
            ("val_fraction", self.val_fraction),
            ("test_fraction", self.test_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(GcnError::invalid_configuration(
                    parameter,
                    format!("must lie in (0, 1) (got {fraction})"),
                ));
            }
        }
        if self.val_fraction + self.test_fraction >= 1.0 {
            return Err(GcnError::invalid_configuration(
                "test_fraction",
                "validation and test fractions must sum to less than 1",
            ));
        }
        if self.attempts_per_negative == 0 {
            return Err(GcnError::invalid_configuration(
                "attempts_per_negative",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of partitioning a graph for link prediction.
///
/// The training positives are implicit: they are the edges left in
/// [`EdgeSplit::adj_train`].
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSplit {
    adj_original: SparseMatrix,
    adj_train: SparseMatrix,
    val_edges: Vec<Edge>,
    val_edges_false: Vec<Edge>,
    test_edges: Vec<Edge>,
    test_edges_false: Vec<Edge>,
}

impl EdgeSplit {
    /// Reassembles a split from the original adjacency and held-out sets,
    /// recomputing the training adjacency.
    ///
    /// The held-out sets must satisfy the same contract [`split_edges`]
    /// guarantees: non-empty, positives are distinct edges of
    /// `adj_original` shared by neither split, negatives are distinct
    /// non-edges without self-loops, and each split has as many negatives as
    /// positives.
    ///
    /// # Errors
    /// Returns [`GcnError::InvalidAdjacency`] when `adj_original` is not a
    /// symmetric, square, binary, diagonal-free matrix,
    /// [`GcnError::NodeOutOfBounds`] when an edge names a missing node and
    /// [`GcnError::InconsistentSplit`] when the held-out sets break the
    /// contract above.
    pub fn from_parts(
        adj_original: SparseMatrix,
        val: (Vec<Edge>, Vec<Edge>),
        test: (Vec<Edge>, Vec<Edge>),
    ) -> Result<Self> {
        validate_adjacency(&adj_original)?;
        if adj_original.diagonal().iter().any(|&value| value != 0.0) {
            return Err(GcnError::invalid_adjacency(
                "original adjacency must not contain self-loops",
            ));
        }
        let node_count = adj_original.rows();
        for edge in val.0.iter().chain(&val.1).chain(&test.0).chain(&test.1) {
            let node = edge.source().max(edge.target());
            if node >= node_count {
                return Err(GcnError::NodeOutOfBounds { node, node_count });
            }
        }
        validate_held_out(&adj_original, (&val.0, &val.1), (&test.0, &test.1))?;

        let removed: HashSet<(usize, usize)> = val
            .0
            .iter()
            .chain(&test.0)
            .map(Edge::canonical)
            .collect();
        let adj_train = remove_edges(&adj_original, &removed);
        Ok(Self {
            adj_original,
            adj_train,
            val_edges: val.0,
            val_edges_false: val.1,
            test_edges: test.0,
            test_edges_false: test.1,
        })
    }

    /// Adjacency with the diagonal stripped, used as ground truth.
    #[must_use]
    pub const fn adj_original(&self) -> &SparseMatrix {
        &self.adj_original
    }

    /// Adjacency with validation and test edges removed.
    #[must_use]
    pub const fn adj_train(&self) -> &SparseMatrix {
        &self.adj_train
    }

    /// Held-out validation positives.
    #[must_use]
    pub fn val_edges(&self) -> &[Edge] {
        &self.val_edges
    }

    /// Sampled validation negatives.
    #[must_use]
    pub fn val_edges_false(&self) -> &[Edge] {
        &self.val_edges_false
    }

    /// Held-out test positives.
    #[must_use]
    pub fn test_edges(&self) -> &[Edge] {
        &self.test_edges
    }

    /// Sampled test negatives.
    #[must_use]
    pub fn test_edges_false(&self) -> &[Edge] {
        &self.test_edges_false
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.adj_original.rows()
    }

    /// Number of undirected edges remaining in the training adjacency.
    #[must_use]
    pub fn train_edge_count(&self) -> usize {
        self.adj_train.upper_triangle().len()
    }
}

/// Partitions `adjacency` into training adjacency plus validation and test
/// positive/negative edge sets.
///
/// Any diagonal entries are stripped first. Positive held-out edges are
/// `floor(E · fraction)` entries of the shuffled upper-triangular edge list.
///
/// # Errors
/// Returns [`GcnError::InvalidConfiguration`] for bad fractions,
/// [`GcnError::InvalidAdjacency`] for a non-square, asymmetric or
/// non-binary matrix,
/// [`GcnError::InsufficientEdges`] when a held-out set would be empty, and
/// [`GcnError::SamplingExhausted`] when negatives cannot be found within the
/// attempt budget.
///
/// # Examples
/// ```
/// use gcnlink_core::{SparseMatrix, SplitConfig, split_edges};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let edges: Vec<(usize, usize)> = (0..40).map(|node| (node, (node + 1) % 40)).collect();
/// let adjacency = SparseMatrix::from_undirected_edges(40, &edges)?;
/// let mut rng = SmallRng::seed_from_u64(123);
/// let split = split_edges(&adjacency, &SplitConfig::default(), &mut rng)?;
/// assert_eq!(split.val_edges().len(), 2);
/// assert_eq!(split.test_edges().len(), 4);
/// assert_eq!(split.train_edge_count(), 34);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
#[instrument(
    name = "core.split_edges",
    err,
    skip(adjacency, config, rng),
    fields(nodes = adjacency.rows(), stored = adjacency.nnz()),
)]
pub fn split_edges<R: Rng>(
    adjacency: &SparseMatrix,
    config: &SplitConfig,
    rng: &mut R,
) -> Result<EdgeSplit> {
    config.validate()?;
    validate_adjacency(adjacency)?;

    let mut adj_original = adjacency.without_diagonal();
    adj_original.eliminate_zeros();

    let mut edges = adj_original.upper_triangle();
    let total = edges.len();
    let num_test = held_out_count(total, config.test_fraction);
    let num_val = held_out_count(total, config.val_fraction);
    if num_test == 0 || num_val == 0 {
        return Err(GcnError::InsufficientEdges {
            edges: total,
            validation: num_val,
            test: num_test,
        });
    }

    edges.shuffle(rng);
    let test_edges: Vec<Edge> = edges[..num_test].iter().copied().map(Edge::from).collect();
    let val_edges: Vec<Edge> = edges[num_test..num_test + num_val]
        .iter()
        .copied()
        .map(Edge::from)
        .collect();

    let removed: HashSet<(usize, usize)> = test_edges
        .iter()
        .chain(&val_edges)
        .map(Edge::canonical)
        .collect();
    let adj_train = remove_edges(&adj_original, &removed);

    let mut sampler = NegativeSampler::new(&adj_original, config.attempts_per_negative);
    let val_edges_false = sampler.sample("validation", val_edges.len(), rng)?;
    let test_edges_false = sampler.sample("test", test_edges.len(), rng)?;

    info!(
        edges = total,
        train = total - num_val - num_test,
        validation = num_val,
        test = num_test,
        "edge split completed"
    );

    Ok(EdgeSplit {
        adj_original,
        adj_train,
        val_edges,
        val_edges_false,
        test_edges,
        test_edges_false,
    })
}

fn validate_adjacency(adjacency: &SparseMatrix) -> Result<()> {
    if !adjacency.is_square() {
        let (rows, cols) = adjacency.shape();
        return Err(GcnError::invalid_adjacency(format!(
            "adjacency must be square (got {rows}x{cols})"
        )));
    }
    // Entries become reconstruction labels, which must be 0 or 1.
    if let Some((row, col, value)) = adjacency
        .iter()
        .find(|&(_, _, value)| value != 0.0 && value != 1.0)
    {
        return Err(GcnError::invalid_adjacency(format!(
            "entry ({row}, {col}) must be 0 or 1 (got {value})"
        )));
    }
    if !adjacency.is_symmetric() {
        return Err(GcnError::invalid_adjacency("adjacency must be symmetric"));
    }
    Ok(())
}

fn validate_held_out(
    adjacency: &SparseMatrix,
    val: (&[Edge], &[Edge]),
    test: (&[Edge], &[Edge]),
) -> Result<()> {
    let mut positives = HashSet::new();
    let mut negatives = HashSet::new();
    for (split, (edges, edges_false)) in [("validation", val), ("test", test)] {
        if edges.is_empty() {
            return Err(GcnError::inconsistent_split(format!(
                "{split} positives are empty"
            )));
        }
        if edges.len() != edges_false.len() {
            return Err(GcnError::inconsistent_split(format!(
                "{split} has {} positives but {} negatives",
                edges.len(),
                edges_false.len()
            )));
        }
        for edge in edges {
            if !is_edge(adjacency, edge) {
                return Err(GcnError::inconsistent_split(format!(
                    "{split} positive {edge:?} is not an edge of the graph"
                )));
            }
            if !positives.insert(edge.canonical()) {
                return Err(GcnError::inconsistent_split(format!(
                    "{split} positive {edge:?} is held out twice"
                )));
            }
        }
        for edge in edges_false {
            if edge.source() == edge.target() || is_edge(adjacency, edge) {
                return Err(GcnError::inconsistent_split(format!(
                    "{split} negative {edge:?} is a self-loop or an edge of the graph"
                )));
            }
            if !negatives.insert(edge.canonical()) {
                return Err(GcnError::inconsistent_split(format!(
                    "{split} negative {edge:?} is sampled twice"
                )));
            }
        }
    }
    Ok(())
}

fn is_edge(adjacency: &SparseMatrix, edge: &Edge) -> bool {
    edge.source() != edge.target()
        && adjacency.get(edge.source(), edge.target()).unwrap_or(0.0) != 0.0
}

fn held_out_count(total: usize, fraction: f64) -> usize {
    (total as f64 * fraction).floor() as usize
}

fn remove_edges(adjacency: &SparseMatrix, removed: &HashSet<(usize, usize)>) -> SparseMatrix {
    let mut train = adjacency.map_values(|row, col, value| {
        if removed.contains(&(row.min(col), row.max(col))) {
            0.0
        } else {
            value
        }
    });
    train.eliminate_zeros();
    train
}

/// Rejection sampler for unordered non-edges shared across splits so no pair
/// is drawn twice.
struct NegativeSampler<'a> {
    adjacency: &'a SparseMatrix,
    seen: HashSet<(usize, usize)>,
    attempts_per_negative: usize,
}

impl<'a> NegativeSampler<'a> {
    fn new(adjacency: &'a SparseMatrix, attempts_per_negative: usize) -> Self {
        Self {
            adjacency,
            seen: HashSet::new(),
            attempts_per_negative,
        }
    }

    fn sample<R: Rng>(
        &mut self,
        split: &'static str,
        requested: usize,
        rng: &mut R,
    ) -> Result<Vec<Edge>> {
        let node_count = self.adjacency.rows();
        let budget = requested.saturating_mul(self.attempts_per_negative);
        let mut sampled = Vec::with_capacity(requested);
        let mut attempts = 0_usize;
        while sampled.len() < requested {
            if attempts >= budget || node_count < 2 {
                return Err(GcnError::SamplingExhausted {
                    split,
                    requested,
                    achieved: sampled.len(),
                });
            }
            attempts += 1;
            let source = rng.gen_range(0..node_count);
            let target = rng.gen_range(0..node_count);
            if source == target {
                continue;
            }
            if self.adjacency.get(source, target).unwrap_or(0.0) != 0.0 {
                continue;
            }
            if !self.seen.insert((source.min(target), source.max(target))) {
                continue;
            }
            sampled.push(Edge::new(source, target));
        }
        Ok(sampled)
    }
}
