//! Structural invariants of the edge split and the normalized adjacency.

use std::collections::HashSet;

use proptest::test_runner::{TestCaseError, TestCaseResult};
use rand::{SeedableRng, rngs::SmallRng};

use crate::{Edge, EdgeSplit, SparseMatrix, SplitConfig, split_edges, symmetric_normalize};

use super::types::GraphFixture;

fn adjacency(fixture: &GraphFixture) -> Result<SparseMatrix, TestCaseError> {
    SparseMatrix::from_undirected_edges(fixture.node_count, &fixture.edges).map_err(|err| {
        TestCaseError::fail(format!(
            "fixture adjacency rejected: {err} (topology={:?})",
            fixture.topology
        ))
    })
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> TestCaseResult {
    if condition {
        Ok(())
    } else {
        Err(TestCaseError::fail(message()))
    }
}

/// Checks that a split partitions the original edges and that sampled
/// negatives are true non-edges.
pub(super) fn run_split_invariants_property(fixture: &GraphFixture, seed: u64) -> TestCaseResult {
    let matrix = adjacency(fixture)?;
    let mut rng = SmallRng::seed_from_u64(seed);
    let split = split_edges(&matrix, &SplitConfig::default(), &mut rng).map_err(|err| {
        TestCaseError::fail(format!(
            "split failed: {err} (topology={:?}, nodes={}, edges={})",
            fixture.topology,
            fixture.node_count,
            fixture.edges.len()
        ))
    })?;

    validate_partition(fixture, &split)?;
    validate_negatives(&split)?;
    ensure(split.adj_train().is_symmetric(), || {
        "training adjacency is not symmetric".to_owned()
    })?;
    ensure(split.adj_train().diagonal().iter().all(|&value| value == 0.0), || {
        "training adjacency has self-loops".to_owned()
    })
}

fn validate_partition(fixture: &GraphFixture, split: &EdgeSplit) -> TestCaseResult {
    let total = fixture.edges.len();
    let expected_val = (total as f64 * 0.05).floor() as usize;
    let expected_test = (total as f64 * 0.10).floor() as usize;
    ensure(split.val_edges().len() == expected_val, || {
        format!("expected {expected_val} validation edges, got {}", split.val_edges().len())
    })?;
    ensure(split.test_edges().len() == expected_test, || {
        format!("expected {expected_test} test edges, got {}", split.test_edges().len())
    })?;

    let train: HashSet<(usize, usize)> = split.adj_train().upper_triangle().into_iter().collect();
    let val: HashSet<(usize, usize)> = split.val_edges().iter().map(Edge::canonical).collect();
    let test: HashSet<(usize, usize)> = split.test_edges().iter().map(Edge::canonical).collect();
    ensure(train.is_disjoint(&val) && train.is_disjoint(&test) && val.is_disjoint(&test), || {
        "held-out edges overlap the training set or each other".to_owned()
    })?;

    let mut union: HashSet<(usize, usize)> = train;
    union.extend(&val);
    union.extend(&test);
    let original: HashSet<(usize, usize)> = fixture.edges.iter().copied().collect();
    ensure(union == original, || {
        "train, validation and test edges do not reassemble the graph".to_owned()
    })
}

fn validate_negatives(split: &EdgeSplit) -> TestCaseResult {
    ensure(split.val_edges_false().len() == split.val_edges().len(), || {
        "validation negatives do not match positives in number".to_owned()
    })?;
    ensure(split.test_edges_false().len() == split.test_edges().len(), || {
        "test negatives do not match positives in number".to_owned()
    })?;
    let mut seen = HashSet::new();
    for edge in split.val_edges_false().iter().chain(split.test_edges_false()) {
        ensure(edge.source() != edge.target(), || format!("self-loop negative {edge:?}"))?;
        ensure(split.adj_original().get(edge.source(), edge.target()) == Some(0.0), || {
            format!("negative {edge:?} is an edge of the graph")
        })?;
        ensure(seen.insert(edge.canonical()), || format!("negative {edge:?} drawn twice"))?;
    }
    Ok(())
}

/// Checks that normalization keeps the matrix symmetric with entries in
/// `(0, 1]`.
pub(super) fn run_normalization_property(fixture: &GraphFixture) -> TestCaseResult {
    let with_loops = adjacency(fixture)?
        .add_identity()
        .map_err(|err| TestCaseError::fail(format!("identity rejected: {err}")))?;
    let normalized = symmetric_normalize(&with_loops)
        .map_err(|err| TestCaseError::fail(format!("normalization failed: {err}")))?;
    ensure(normalized.nnz() == with_loops.nnz(), || {
        "normalization changed the sparsity pattern".to_owned()
    })?;
    ensure(normalized.is_symmetric(), || "normalized matrix is not symmetric".to_owned())?;
    for (row, col, value) in normalized.iter() {
        ensure(value > 0.0 && value <= 1.0 + f32::EPSILON, || {
            format!("entry ({row}, {col}) = {value} outside (0, 1]")
        })?;
    }
    Ok(())
}
