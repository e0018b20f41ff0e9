//! Normalization, triple conversion and dropout over [`SparseMatrix`].

use rand::Rng;
use tracing::warn;

use crate::{Result, error::GcnError, sparse::SparseMatrix};

/// Coordinate form of a sparse matrix: parallel index pairs and values plus
/// the logical shape.
///
/// Index pairs are emitted in row-major order and `values[k]` belongs to
/// `indices[k]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseTriple {
    /// `[row, col]` coordinates of each stored entry.
    pub indices: Vec<[usize; 2]>,
    /// Stored values, aligned with `indices`.
    pub values: Vec<f32>,
    /// Logical `(rows, cols)` of the matrix.
    pub shape: (usize, usize),
}

impl SparseTriple {
    /// Returns the number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// Converts `matrix` into its `(indices, values, shape)` triple.
///
/// # Examples
/// ```
/// use gcnlink_core::{SparseMatrix, to_triple};
///
/// let triple = to_triple(&SparseMatrix::identity(2));
/// assert_eq!(triple.indices, vec![[0, 0], [1, 1]]);
/// assert_eq!(triple.values, vec![1.0, 1.0]);
/// assert_eq!(triple.shape, (2, 2));
/// ```
#[must_use]
pub fn to_triple(matrix: &SparseMatrix) -> SparseTriple {
    let (indices, values) = matrix
        .iter()
        .map(|(row, col, value)| ([row, col], value))
        .unzip();
    SparseTriple {
        indices,
        values,
        shape: matrix.shape(),
    }
}

/// Rebuilds a [`SparseMatrix`] from a triple.
///
/// # Errors
/// Returns [`GcnError::ShapeMismatch`] when `indices` and `values` differ in
/// length and [`GcnError::NodeOutOfBounds`] when an index exceeds the shape.
pub fn from_triple(triple: &SparseTriple) -> Result<SparseMatrix> {
    if triple.indices.len() != triple.values.len() {
        return Err(GcnError::ShapeMismatch {
            operation: "sparse triple",
            left: (triple.indices.len(), 2),
            right: (triple.values.len(), 1),
        });
    }
    let (rows, cols) = triple.shape;
    SparseMatrix::from_triplets(
        rows,
        cols,
        triple
            .indices
            .iter()
            .zip(&triple.values)
            .map(|(&[row, col], &value)| (row, col, value)),
    )
}

/// Computes `D^-1/2 · A · D^-1/2` where `D_ii` is the `i`-th row sum of `A`.
///
/// Rows with zero degree get a scaling factor of zero, so isolated nodes
/// become all-zero rows and columns rather than NaN.
///
/// # Errors
/// Returns [`GcnError::ShapeMismatch`] when `adjacency` is not square and
/// [`GcnError::InvalidAdjacency`] when it stores a negative value.
///
/// # Examples
/// ```
/// use gcnlink_core::{SparseMatrix, symmetric_normalize};
///
/// let adjacency = SparseMatrix::from_undirected_edges(2, &[(0, 1)])?.add_identity()?;
/// let normalized = symmetric_normalize(&adjacency)?;
/// assert!((normalized.get(0, 1).unwrap_or_default() - 0.5).abs() < 1e-6);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
pub fn symmetric_normalize(adjacency: &SparseMatrix) -> Result<SparseMatrix> {
    if !adjacency.is_square() {
        return Err(GcnError::ShapeMismatch {
            operation: "symmetric normalize",
            left: adjacency.shape(),
            right: (adjacency.cols(), adjacency.rows()),
        });
    }
    if let Some((row, col, _)) = adjacency.iter().find(|&(_, _, value)| value < 0.0) {
        return Err(GcnError::invalid_adjacency(format!(
            "negative weight at ({row}, {col})"
        )));
    }

    let inv_sqrt_degree: Vec<f32> = adjacency
        .row_sums()
        .into_iter()
        .map(|degree| if degree > 0.0 { degree.sqrt().recip() } else { 0.0 })
        .collect();
    let isolated = inv_sqrt_degree.iter().filter(|&&factor| factor == 0.0).count();
    if isolated > 0 {
        warn!(isolated, "adjacency has zero-degree rows; normalizing them to zero");
    }

    Ok(adjacency.map_values(|row, col, value| {
        value * (inv_sqrt_degree[row] * inv_sqrt_degree[col])
    }))
}

/// Applies inverted dropout to the stored entries of a sparse input.
///
/// Each of the `num_nonzeros` stored entries survives independently with
/// probability `keep_probability`; survivors are scaled by
/// `1 / keep_probability` and dropped entries are removed from the
/// structure. `keep_probability == 1` returns the input unchanged without
/// drawing from `rng`, and `keep_probability == 0` returns an empty matrix
/// of the same shape.
///
/// # Errors
/// Returns [`GcnError::NonzeroMismatch`] when `num_nonzeros` differs from the
/// stored entry count and [`GcnError::InvalidConfiguration`] when
/// `keep_probability` is outside `[0, 1]`.
///
/// # Examples
/// ```
/// use gcnlink_core::{SparseMatrix, sparse_dropout};
/// use rand::{SeedableRng, rngs::SmallRng};
///
/// let features = SparseMatrix::identity(4);
/// let mut rng = SmallRng::seed_from_u64(7);
/// let same = sparse_dropout(&features, 1.0, 4, &mut rng)?;
/// assert_eq!(same, features);
/// let none = sparse_dropout(&features, 0.0, 4, &mut rng)?;
/// assert_eq!(none.nnz(), 0);
/// # Ok::<(), gcnlink_core::GcnError>(())
/// ```
pub fn sparse_dropout<R: Rng>(
    input: &SparseMatrix,
    keep_probability: f32,
    num_nonzeros: usize,
    rng: &mut R,
) -> Result<SparseMatrix> {
    if num_nonzeros != input.nnz() {
        return Err(GcnError::NonzeroMismatch {
            expected: num_nonzeros,
            found: input.nnz(),
        });
    }
    if !(0.0..=1.0).contains(&keep_probability) {
        return Err(GcnError::invalid_configuration(
            "keep_probability",
            format!("must lie in [0, 1] (got {keep_probability})"),
        ));
    }
    if keep_probability >= 1.0 {
        return Ok(input.clone());
    }
    if keep_probability <= 0.0 {
        let (rows, cols) = input.shape();
        return Ok(SparseMatrix::zeros(rows, cols));
    }

    let scale = keep_probability.recip();
    let survivors: Vec<(usize, usize, f32)> = input
        .iter()
        .filter(|_| rng.r#gen::<f32>() < keep_probability)
        .map(|(row, col, value)| (row, col, value * scale))
        .collect();
    let (rows, cols) = input.shape();
    SparseMatrix::from_triplets(rows, cols, survivors)
}
