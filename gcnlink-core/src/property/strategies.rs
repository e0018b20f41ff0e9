//! Strategy builders for graph property tests.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::{Rng, SeedableRng, rngs::SmallRng};

use super::types::{GraphFixture, GraphTopology};

/// Smallest generated graph; large enough that a 5% validation share of
/// the ring alone is non-empty.
const MIN_NODES: usize = 40;
const MAX_NODES: usize = 80;

/// Generates graph fixtures across every topology.
pub(super) fn graph_fixture_strategy() -> impl Strategy<Value = GraphFixture> {
    (any::<GraphTopology>(), any::<u64>()).prop_map(|(topology, seed)| {
        let mut rng = SmallRng::seed_from_u64(seed);
        generate_fixture(topology, &mut rng)
    })
}

/// Generates a fixture for one topology.
pub(super) fn generate_fixture(topology: GraphTopology, rng: &mut SmallRng) -> GraphFixture {
    let node_count = rng.gen_range(MIN_NODES..=MAX_NODES);
    let mut edges = BTreeSet::new();
    match topology {
        GraphTopology::ChordedRing => {
            for node in 0..node_count {
                insert(&mut edges, node, (node + 1) % node_count);
            }
            for _ in 0..node_count / 2 {
                let left = rng.gen_range(0..node_count);
                let right = rng.gen_range(0..node_count);
                insert(&mut edges, left, right);
            }
        }
        GraphTopology::ErdosRenyi => {
            let probability = rng.gen_range(0.05..0.12);
            for left in 0..node_count {
                for right in (left + 1)..node_count {
                    if rng.gen_bool(probability) {
                        insert(&mut edges, left, right);
                    }
                }
            }
            // Keeps the edge count above the held-out minimum.
            for node in 0..node_count {
                insert(&mut edges, node, (node + 1) % node_count);
            }
        }
        GraphTopology::TwoCommunities => {
            let half = node_count / 2;
            for left in 0..node_count {
                for right in (left + 1)..node_count {
                    let same_block = (left < half) == (right < half);
                    if same_block && rng.gen_bool(0.25) {
                        insert(&mut edges, left, right);
                    }
                }
            }
            for _ in 0..3 {
                let left = rng.gen_range(0..half);
                let right = rng.gen_range(half..node_count);
                insert(&mut edges, left, right);
            }
            for node in 0..node_count {
                insert(&mut edges, node, (node + 1) % node_count);
            }
        }
    }
    GraphFixture {
        topology,
        node_count,
        edges: edges.into_iter().collect(),
    }
}

fn insert(edges: &mut BTreeSet<(usize, usize)>, left: usize, right: usize) {
    if left != right {
        edges.insert((left.min(right), left.max(right)));
    }
}

/// Generates score vectors with at least one positive and one negative
/// label.
pub(super) fn labelled_scores_strategy() -> impl Strategy<Value = (Vec<bool>, Vec<f64>)> {
    (1_usize..40, 1_usize..40)
        .prop_flat_map(|(positives, negatives)| {
            let total = positives + negatives;
            let labels: Vec<bool> = (0..total).map(|index| index < positives).collect();
            // Coarse buckets produce ties regularly.
            let scores = prop::collection::vec((0_u8..=20).prop_map(|bucket| f64::from(bucket) / 20.0), total);
            (Just(labels), scores)
        })
}
