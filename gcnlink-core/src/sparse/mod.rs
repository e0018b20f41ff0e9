//! Sparse matrix storage and the sparse operations the GCN pipeline needs.
//!
//! Adjacency and feature matrices are held in CSR form. Normalization and
//! dropout produce new matrices; nothing here mutates its input.

mod matrix;
mod ops;

pub use self::{
    matrix::SparseMatrix,
    ops::{SparseTriple, from_triple, sparse_dropout, symmetric_normalize, to_triple},
};
