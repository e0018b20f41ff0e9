//! Property-based test runners plus targeted rstest cases.

use proptest::prelude::*;
use rand::{SeedableRng, rngs::SmallRng};

use crate::test_utils::suite_proptest_config;

use super::scoring::{
    run_loss_range_property, run_metric_range_property, run_perfect_separation_property,
};
use super::strategies::{generate_fixture, graph_fixture_strategy, labelled_scores_strategy};
use super::structural::{run_normalization_property, run_split_invariants_property};
use super::types::GraphTopology;

proptest! {
    #![proptest_config(suite_proptest_config(64))]

    #[test]
    fn split_partitions_the_graph(fixture in graph_fixture_strategy(), seed in any::<u64>()) {
        run_split_invariants_property(&fixture, seed)?;
    }

    #[test]
    fn normalization_is_symmetric_and_bounded(fixture in graph_fixture_strategy()) {
        run_normalization_property(&fixture)?;
    }
}

proptest! {
    #![proptest_config(suite_proptest_config(256))]

    #[test]
    fn ranking_metrics_stay_in_range((labels, scores) in labelled_scores_strategy()) {
        run_metric_range_property(&labels, &scores)?;
    }

    #[test]
    fn perfect_separation_scores_one((labels, _) in labelled_scores_strategy()) {
        run_perfect_separation_property(&labels)?;
    }

    #[test]
    fn reconstruction_cost_is_non_negative(
        logits in prop::collection::vec(-60.0_f32..60.0, 16),
        labels in prop::collection::vec(any::<bool>(), 16),
    ) {
        run_loss_range_property(&logits, &labels)?;
    }
}

#[rstest::rstest]
#[case::ring_42(GraphTopology::ChordedRing, 42)]
#[case::ring_999(GraphTopology::ChordedRing, 999)]
#[case::random_42(GraphTopology::ErdosRenyi, 42)]
#[case::communities_7(GraphTopology::TwoCommunities, 7)]
fn split_invariants_hold_for_known_seeds(#[case] topology: GraphTopology, #[case] seed: u64) {
    let fixture = generate_fixture(topology, &mut SmallRng::seed_from_u64(seed));
    run_split_invariants_property(&fixture, seed).expect("split invariants hold");
    run_normalization_property(&fixture).expect("normalization invariants hold");
}
