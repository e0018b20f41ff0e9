//! Shared test utilities for `gcnlink-core`.

use gcnlink_test_support::ci::property_test_profile::ProptestRunProfile;
use proptest::test_runner::Config as ProptestConfig;

use crate::{Result, dataset::GraphSource, sparse::SparseMatrix};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Builds a standard proptest configuration from the shared CI profile.
///
/// This keeps property suites aligned on the same `PROGTEST_CASES` and
/// `GCNLINK_PBT_FORK` interpretation.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Builds the adjacency of a circulant graph where node `n` links to
/// `n + offset` for every offset.
pub(crate) fn circulant_edges(node_count: usize, offsets: &[usize]) -> Vec<(usize, usize)> {
    (0..node_count)
        .flat_map(|node| {
            offsets
                .iter()
                .map(move |offset| (node, (node + offset) % node_count))
        })
        .filter(|(left, right)| left != right)
        .collect()
}

/// [`GraphSource`] over a circulant graph that records adjacency requests.
#[derive(Clone)]
pub(crate) struct CountingSource {
    node_count: usize,
    offsets: Vec<usize>,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    /// Creates a counting source over `node_count` nodes.
    #[must_use]
    pub(crate) fn new(node_count: usize, offsets: Vec<usize>) -> Self {
        Self {
            node_count,
            offsets,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns how many times [`GraphSource::adjacency`] has been called.
    #[must_use]
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl GraphSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    fn node_count(&self) -> usize {
        self.node_count
    }

    fn adjacency(&self) -> Result<SparseMatrix> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        SparseMatrix::from_undirected_edges(
            self.node_count,
            &circulant_edges(self.node_count, &self.offsets),
        )
    }
}
