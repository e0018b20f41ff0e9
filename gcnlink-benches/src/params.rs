//! Benchmark parameter types.

use std::fmt;

/// Parameters identifying one synthetic graph in a benchmark group.
#[derive(Clone, Copy, Debug)]
pub struct GraphBenchParams {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of planted communities.
    pub communities: usize,
}

impl fmt::Display for GraphBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={},k={}", self.node_count, self.communities)
    }
}
