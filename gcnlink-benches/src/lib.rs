//! Benchmark support crate for gcnlink.
//!
//! Provides seeded synthetic graphs and parameter types used by the Criterion
//! benchmarks for adjacency normalization, edge splitting and the training
//! step.

pub mod error;
pub mod params;
pub mod source;
