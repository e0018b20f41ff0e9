use gcnlink_core::{GraphSource, Result, SparseMatrix};

/// Circulant graph: node `n` links to `n + offset` for every offset.
#[derive(Clone)]
pub struct Circulant {
    node_count: usize,
    offsets: Vec<usize>,
}

impl Circulant {
    #[must_use]
    pub fn new(node_count: usize, offsets: &[usize]) -> Self {
        Self {
            node_count,
            offsets: offsets.to_vec(),
        }
    }
}

impl GraphSource for Circulant {
    fn name(&self) -> &str {
        "circulant"
    }

    fn node_count(&self) -> usize {
        self.node_count
    }

    fn adjacency(&self) -> Result<SparseMatrix> {
        let edges: Vec<(usize, usize)> = (0..self.node_count)
            .flat_map(|node| {
                self.offsets
                    .iter()
                    .map(move |offset| (node, (node + offset) % self.node_count))
            })
            .collect();
        SparseMatrix::from_undirected_edges(self.node_count, &edges)
    }
}
