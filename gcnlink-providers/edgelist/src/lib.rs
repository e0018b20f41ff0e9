//! Edge-list provider implementing [`GraphSource`].
//!
//! Each non-blank line names one undirected edge as two node labels
//! separated by whitespace or a comma. Lines starting with `#` are comments
//! and any columns after the second, such as weights, are ignored. Labels
//! are interned in order of first appearance; self-loops and repeated edges
//! are dropped.

use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use gcnlink_core::{GraphSource, SparseMatrix};
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading an edge list.
#[derive(Debug, Error)]
pub enum EdgeListError {
    /// The input held no edges.
    #[error("edge list contains no edges")]
    EmptyInput,
    /// A line named fewer than two nodes.
    #[error("line {line} does not name two nodes: `{content}`")]
    Malformed {
        /// One-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// Reading the input failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Undirected graph read from an edge list.
#[derive(Clone, Debug)]
pub struct EdgeListProvider {
    name: String,
    labels: Vec<String>,
    edges: Vec<(usize, usize)>,
}

impl EdgeListProvider {
    /// Reads an edge list from `path`, naming the source after the file.
    ///
    /// # Errors
    /// Returns [`EdgeListError::Io`] when the file cannot be read plus any
    /// error from [`EdgeListProvider::try_from_reader`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EdgeListError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned());
        Self::try_from_reader(name, BufReader::new(File::open(path)?))
    }

    /// Parses an edge list from `reader`.
    ///
    /// # Errors
    /// Returns [`EdgeListError::Malformed`] for a line with a single label,
    /// [`EdgeListError::EmptyInput`] when no edge remains and
    /// [`EdgeListError::Io`] on read failures.
    ///
    /// # Examples
    /// ```
    /// use std::io::Cursor;
    /// use gcnlink_core::GraphSource;
    /// use gcnlink_providers_edgelist::EdgeListProvider;
    ///
    /// let provider = EdgeListProvider::try_from_reader("demo", Cursor::new("a b\nb,c\n# note\nc a\n"))?;
    /// assert_eq!(provider.node_count(), 3);
    /// assert_eq!(provider.edge_count(), 3);
    /// # Ok::<(), gcnlink_providers_edgelist::EdgeListError>(())
    /// ```
    pub fn try_from_reader<R: BufRead>(
        name: impl Into<String>,
        reader: R,
    ) -> Result<Self, EdgeListError> {
        let mut interned: HashMap<String, usize> = HashMap::new();
        let mut labels = Vec::new();
        let mut edges = BTreeSet::new();
        let mut intern = |label: &str| -> usize {
            *interned.entry(label.to_owned()).or_insert_with(|| {
                labels.push(label.to_owned());
                labels.len() - 1
            })
        };

        let mut self_loops = 0_usize;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut tokens = trimmed
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty());
            let (Some(left), Some(right)) = (tokens.next(), tokens.next()) else {
                return Err(EdgeListError::Malformed {
                    line: index + 1,
                    content: trimmed.to_owned(),
                });
            };
            let left = intern(left);
            let right = intern(right);
            if left == right {
                self_loops += 1;
                continue;
            }
            edges.insert((left.min(right), left.max(right)));
        }

        if edges.is_empty() {
            return Err(EdgeListError::EmptyInput);
        }
        debug!(nodes = labels.len(), edges = edges.len(), self_loops, "edge list parsed");
        Ok(Self {
            name: name.into(),
            labels,
            edges: edges.into_iter().collect(),
        })
    }

    /// Replaces the source name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Node labels indexed by node id.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Distinct undirected edges as `(smaller, larger)` node ids.
    #[must_use]
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Number of distinct undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl GraphSource for EdgeListProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn node_count(&self) -> usize {
        self.labels.len()
    }

    fn adjacency(&self) -> gcnlink_core::Result<SparseMatrix> {
        SparseMatrix::from_undirected_edges(self.labels.len(), &self.edges)
    }
}
