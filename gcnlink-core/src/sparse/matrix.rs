//! Compressed sparse row storage for adjacency and feature matrices.

use std::collections::BTreeSet;

use ndarray::Array2;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{Result, error::GcnError};

/// A real-valued sparse matrix in compressed sparse row (CSR) layout.
///
/// Column indices are sorted within each row and every `(row, col)` position
/// is stored at most once. Explicit zeros may be stored until
/// [`SparseMatrix::eliminate_zeros`] removes them.
///
/// # Examples
/// ```
/// use gcnlink_core::SparseMatrix;
///
/// let adjacency = SparseMatrix::from_undirected_edges(3, &[(0, 1), (1, 2)])?;
/// assert_eq!(adjacency.shape(), (3, 3));
/// assert_eq!(adjacency.nnz(), 4);
/// assert_eq!(adjacency.get(1, 0), Some(1.0));
/// assert_eq!(adjacency.get(0, 2), Some(0.0));
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseMatrix {
    /// Builds a matrix from `(row, col, value)` triplets, summing duplicates.
    ///
    /// # Errors
    /// Returns [`GcnError::NodeOutOfBounds`] when a triplet lies outside the
    /// requested shape.
    pub fn from_triplets<I>(rows: usize, cols: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let triplets: Vec<(usize, usize, f32)> = entries.into_iter().collect();
        for &(row, col, _) in &triplets {
            if row >= rows {
                return Err(GcnError::NodeOutOfBounds {
                    node: row,
                    node_count: rows,
                });
            }
            if col >= cols {
                return Err(GcnError::NodeOutOfBounds {
                    node: col,
                    node_count: cols,
                });
            }
        }
        Ok(Self::assemble(rows, cols, triplets))
    }

    /// Builds a symmetric 0/1 adjacency matrix from undirected edges.
    ///
    /// Self-loops are skipped and repeated edges (in either orientation) are
    /// stored once.
    ///
    /// # Errors
    /// Returns [`GcnError::NodeOutOfBounds`] when an endpoint is not below
    /// `node_count`.
    pub fn from_undirected_edges(node_count: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut canonical = BTreeSet::new();
        for &(left, right) in edges {
            let node = left.max(right);
            if node >= node_count {
                return Err(GcnError::NodeOutOfBounds { node, node_count });
            }
            if left != right {
                canonical.insert((left.min(right), left.max(right)));
            }
        }
        let triplets = canonical
            .into_iter()
            .flat_map(|(low, high)| [(low, high, 1.0), (high, low, 1.0)])
            .collect();
        Ok(Self::assemble(node_count, node_count, triplets))
    }

    /// Returns the `size × size` identity matrix.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        Self {
            rows: size,
            cols: size,
            indptr: (0..=size).collect(),
            indices: (0..size).collect(),
            values: vec![1.0; size],
        }
    }

    /// Returns an empty (all-zero) matrix of the given shape.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            indptr: vec![0; rows + 1],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    // Triplets must already be bounds-checked.
    fn assemble(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f32)>) -> Self {
        triplets.sort_unstable_by_key(|&(row, col, _)| (row, col));
        let mut indptr = vec![0_usize; rows + 1];
        let mut indices = Vec::with_capacity(triplets.len());
        let mut values: Vec<f32> = Vec::with_capacity(triplets.len());
        let mut last = None;
        for (row, col, value) in triplets {
            if last == Some((row, col)) {
                if let Some(stored) = values.last_mut() {
                    *stored += value;
                }
                continue;
            }
            last = Some((row, col));
            indices.push(col);
            values.push(value);
            indptr[row + 1] += 1;
        }
        for row in 0..rows {
            indptr[row + 1] += indptr[row];
        }
        Self {
            rows,
            cols,
            indptr,
            indices,
            values,
        }
    }

    /// Returns `(rows, cols)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the number of stored entries, explicit zeros included.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the matrix is square.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Iterates the stored `(col, value)` pairs of `row` in column order.
    ///
    /// Rows outside the matrix yield nothing.
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let (start, end) = match (self.indptr.get(row), self.indptr.get(row + 1)) {
            (Some(&start), Some(&end)) => (start, end),
            _ => (0, 0),
        };
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Iterates every stored `(row, col, value)` triplet in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        (0..self.rows).flat_map(move |row| {
            self.row_entries(row)
                .map(move |(col, value)| (row, col, value))
        })
    }

    /// Returns the value at `(row, col)`, `Some(0.0)` for unstored positions
    /// and `None` outside the matrix.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        let found = self.indices[start..end]
            .binary_search(&col)
            .map_or(0.0, |offset| self.values[start + offset]);
        Some(found)
    }

    /// Returns the transposed matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let triplets = self.iter().map(|(row, col, value)| (col, row, value)).collect();
        Self::assemble(self.cols, self.rows, triplets)
    }

    /// Returns the element-wise sum `self + other`.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when the shapes differ.
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(GcnError::ShapeMismatch {
                operation: "sparse add",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let triplets = self.iter().chain(other.iter()).collect();
        Ok(Self::assemble(self.rows, self.cols, triplets))
    }

    /// Returns `self + I`.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when the matrix is not square.
    pub fn add_identity(&self) -> Result<Self> {
        self.add(&Self::identity(self.rows))
            .map_err(|_| GcnError::ShapeMismatch {
                operation: "add identity",
                left: self.shape(),
                right: (self.rows, self.rows),
            })
    }

    /// Returns the main diagonal.
    #[must_use]
    pub fn diagonal(&self) -> Vec<f32> {
        (0..self.rows.min(self.cols))
            .map(|index| self.get(index, index).unwrap_or(0.0))
            .collect()
    }

    /// Returns a copy with every diagonal entry removed.
    #[must_use]
    pub fn without_diagonal(&self) -> Self {
        let triplets = self.iter().filter(|&(row, col, _)| row != col).collect();
        Self::assemble(self.rows, self.cols, triplets)
    }

    /// Removes stored entries whose value is exactly zero.
    pub fn eliminate_zeros(&mut self) {
        let triplets = self.iter().filter(|&(_, _, value)| value != 0.0).collect();
        *self = Self::assemble(self.rows, self.cols, triplets);
    }

    /// Returns the sum of each row.
    #[must_use]
    pub fn row_sums(&self) -> Vec<f32> {
        (0..self.rows)
            .map(|row| self.row_entries(row).map(|(_, value)| value).sum())
            .collect()
    }

    /// Returns the sum of all stored values.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().map(|&value| f64::from(value)).sum()
    }

    /// Returns whether the matrix equals its transpose.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.is_square()
            && self
                .iter()
                .all(|(row, col, value)| self.get(col, row) == Some(value))
    }

    /// Returns the strictly upper-triangular nonzero positions in row-major
    /// order. For a symmetric adjacency these are its undirected edges.
    #[must_use]
    pub fn upper_triangle(&self) -> Vec<(usize, usize)> {
        self.iter()
            .filter(|&(row, col, value)| row < col && value != 0.0)
            .map(|(row, col, _)| (row, col))
            .collect()
    }

    /// Returns the element-wise map of every stored value.
    #[must_use]
    pub fn map_values(&self, mut f: impl FnMut(usize, usize, f32) -> f32) -> Self {
        let values = self.iter().map(|(row, col, value)| f(row, col, value)).collect();
        Self {
            values,
            ..self.clone()
        }
    }

    /// Computes the sparse-dense product `self · dense`.
    ///
    /// With the `parallel` feature rows are computed on the Rayon pool.
    ///
    /// # Errors
    /// Returns [`GcnError::ShapeMismatch`] when `self.cols() != dense.nrows()`.
    pub fn matmul_dense(&self, dense: &Array2<f32>) -> Result<Array2<f32>> {
        if self.cols != dense.nrows() {
            return Err(GcnError::ShapeMismatch {
                operation: "sparse-dense matmul",
                left: self.shape(),
                right: dense.dim(),
            });
        }
        let width = dense.ncols();
        let compute_row = |row: usize| {
            let mut acc = vec![0.0_f32; width];
            for (col, value) in self.row_entries(row) {
                for (slot, &x) in acc.iter_mut().zip(dense.row(col).iter()) {
                    *slot += value * x;
                }
            }
            acc
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f32>> = (0..self.rows).into_par_iter().map(compute_row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f32>> = (0..self.rows).map(compute_row).collect();

        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        Array2::from_shape_vec((self.rows, width), flat).map_err(|_| GcnError::ShapeMismatch {
            operation: "sparse-dense matmul",
            left: self.shape(),
            right: dense.dim(),
        })
    }

    /// Expands the matrix into a dense array.
    #[must_use]
    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros((self.rows, self.cols));
        for (row, col, value) in self.iter() {
            dense[[row, col]] += value;
        }
        dense
    }
}
