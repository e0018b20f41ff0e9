//! JSON persistence for precomputed edge splits.
//!
//! A cached split stores the undirected edges of the original graph and the
//! four held-out edge lists. The training adjacency is rebuilt on load and
//! the held-out sets are checked again, so a stale or edited cache is
//! rejected rather than trained on. Splits only hold binary adjacencies,
//! which is why the edge list is enough to restore one exactly.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    Result,
    error::GcnError,
    sparse::SparseMatrix,
    split::{Edge, EdgeSplit},
};

/// Serializable snapshot of an [`EdgeSplit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCache {
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Undirected edges of the original graph, each listed once.
    pub edges: Vec<Edge>,
    /// Validation positives.
    pub val_edges: Vec<Edge>,
    /// Validation negatives.
    pub val_edges_false: Vec<Edge>,
    /// Test positives.
    pub test_edges: Vec<Edge>,
    /// Test negatives.
    pub test_edges_false: Vec<Edge>,
}

impl From<&EdgeSplit> for SplitCache {
    fn from(split: &EdgeSplit) -> Self {
        Self {
            node_count: split.node_count(),
            edges: split
                .adj_original()
                .upper_triangle()
                .into_iter()
                .map(Edge::from)
                .collect(),
            val_edges: split.val_edges().to_vec(),
            val_edges_false: split.val_edges_false().to_vec(),
            test_edges: split.test_edges().to_vec(),
            test_edges_false: split.test_edges_false().to_vec(),
        }
    }
}

impl SplitCache {
    /// Rebuilds the [`EdgeSplit`] this snapshot describes.
    ///
    /// # Errors
    /// Returns [`GcnError::NodeOutOfBounds`] when an edge names a node beyond
    /// `node_count` and the errors of [`EdgeSplit::from_parts`] when the
    /// held-out sets are inconsistent with the edges.
    pub fn into_split(self) -> Result<EdgeSplit> {
        let pairs: Vec<(usize, usize)> = self
            .edges
            .iter()
            .map(|edge| (edge.source(), edge.target()))
            .collect();
        let adj_original = SparseMatrix::from_undirected_edges(self.node_count, &pairs)?;
        EdgeSplit::from_parts(
            adj_original,
            (self.val_edges, self.val_edges_false),
            (self.test_edges, self.test_edges_false),
        )
    }
}

/// Writes `split` to `path` as JSON.
///
/// # Errors
/// Returns [`GcnError::SplitCache`] when the file cannot be created or
/// written.
#[instrument(name = "core.save_split", err, skip(split), fields(path = %path.display()))]
pub fn save_split(split: &EdgeSplit, path: &Path) -> Result<()> {
    let cache = SplitCache::from(split);
    let file = File::create(path).map_err(|error| cache_error(path, &error))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &cache).map_err(|error| cache_error(path, &error))?;
    writer.flush().map_err(|error| cache_error(path, &error))?;
    info!(edges = cache.edges.len(), "split cache written");
    Ok(())
}

/// Reads a split previously written by [`save_split`].
///
/// # Errors
/// Returns [`GcnError::SplitCache`] when the file is missing or malformed
/// or when [`SplitCache::into_split`] rejects its contents.
#[instrument(name = "core.load_split", err, fields(path = %path.display()))]
pub fn load_split(path: &Path) -> Result<EdgeSplit> {
    let file = File::open(path).map_err(|error| cache_error(path, &error))?;
    let cache: SplitCache = serde_json::from_reader(BufReader::new(file))
        .map_err(|error| cache_error(path, &error))?;
    let split = cache
        .into_split()
        .map_err(|error| cache_error(path, &error))?;
    info!(nodes = split.node_count(), "split cache loaded");
    Ok(split)
}

fn cache_error(path: &Path, error: &dyn std::error::Error) -> GcnError {
    GcnError::SplitCache {
        path: Arc::from(path.display().to_string()),
        reason: Arc::from(error.to_string()),
    }
}
