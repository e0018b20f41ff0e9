//! Seeded stochastic block model graphs.
//!
//! Nodes are assigned to communities uniformly at random; each pair is then
//! linked with the intra- or inter-community probability.

use std::collections::BTreeSet;

use gcnlink_core::{GraphSource, SparseMatrix};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors raised while generating a synthetic graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntheticError {
    /// The graph would have fewer than two nodes.
    #[error("node_count must be at least 2 (got {node_count})")]
    TooFewNodes {
        /// Requested node count.
        node_count: usize,
    },
    /// No communities were requested.
    #[error("communities must be non-zero")]
    ZeroCommunities,
    /// A link probability was outside `[0, 1]`.
    #[error("{name} must lie in [0, 1] (got {value})")]
    InvalidProbability {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
}

/// Configuration for [`SyntheticGraph::generate`].
#[derive(Clone, Copy, Debug)]
pub struct BlockModelConfig {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of planted communities.
    pub communities: usize,
    /// Link probability inside a community.
    pub intra_probability: f64,
    /// Link probability across communities.
    pub inter_probability: f64,
    /// Generator seed.
    pub seed: u64,
}

impl BlockModelConfig {
    /// Targets an expected degree of roughly `degree`, with nine in ten
    /// edges inside communities.
    #[must_use]
    pub fn with_expected_degree(node_count: usize, communities: usize, degree: f64, seed: u64) -> Self {
        let nodes = node_count.max(2) as f64;
        let blocks = communities.max(1) as f64;
        let intra_pairs = nodes / blocks;
        let inter_pairs = (nodes - intra_pairs).max(1.0);
        Self {
            node_count,
            communities,
            intra_probability: (0.9 * degree / intra_pairs).clamp(0.0, 1.0),
            inter_probability: (0.1 * degree / inter_pairs).clamp(0.0, 1.0),
            seed,
        }
    }
}

/// Undirected graph drawn from a stochastic block model.
#[derive(Clone, Debug)]
pub struct SyntheticGraph {
    node_count: usize,
    communities: Vec<usize>,
    edges: Vec<(usize, usize)>,
}

impl SyntheticGraph {
    /// Draws a graph for `config`.
    ///
    /// # Errors
    /// Returns [`SyntheticError`] for invalid parameters.
    pub fn generate(config: &BlockModelConfig) -> Result<Self, SyntheticError> {
        if config.node_count < 2 {
            return Err(SyntheticError::TooFewNodes {
                node_count: config.node_count,
            });
        }
        if config.communities == 0 {
            return Err(SyntheticError::ZeroCommunities);
        }
        for (name, value) in [
            ("intra_probability", config.intra_probability),
            ("inter_probability", config.inter_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SyntheticError::InvalidProbability { name, value });
            }
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let communities: Vec<usize> = (0..config.node_count)
            .map(|_| rng.gen_range(0..config.communities))
            .collect();
        let mut edges = BTreeSet::new();
        for (left, left_block) in communities.iter().enumerate() {
            for (right, right_block) in communities.iter().enumerate().skip(left + 1) {
                let probability = if left_block == right_block {
                    config.intra_probability
                } else {
                    config.inter_probability
                };
                if rng.gen_bool(probability) {
                    edges.insert((left, right));
                }
            }
        }
        Ok(Self {
            node_count: config.node_count,
            communities,
            edges: edges.into_iter().collect(),
        })
    }

    /// Community of every node.
    #[must_use]
    pub fn communities(&self) -> &[usize] {
        &self.communities
    }

    /// Distinct undirected edges with the smaller endpoint first.
    #[must_use]
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

impl GraphSource for SyntheticGraph {
    fn name(&self) -> &str {
        "block-model"
    }

    fn node_count(&self) -> usize {
        self.node_count
    }

    fn adjacency(&self) -> gcnlink_core::Result<SparseMatrix> {
        SparseMatrix::from_undirected_edges(self.node_count, &self.edges)
    }
}
