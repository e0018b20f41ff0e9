//! Fixture types shared by the property strategies.

use test_strategy::Arbitrary;

/// Shape of a generated graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Arbitrary)]
pub(super) enum GraphTopology {
    /// A ring with random chords.
    #[weight(3)]
    ChordedRing,
    /// Independent edges with a sparse per-pair probability.
    #[weight(2)]
    ErdosRenyi,
    /// Two dense blocks joined by a handful of bridges.
    #[weight(1)]
    TwoCommunities,
}

/// A generated undirected graph.
#[derive(Clone, Debug)]
pub(super) struct GraphFixture {
    /// Topology the edges were drawn from.
    pub(super) topology: GraphTopology,
    /// Number of nodes.
    pub(super) node_count: usize,
    /// Unordered edges without self-loops or duplicates.
    pub(super) edges: Vec<(usize, usize)>,
}
