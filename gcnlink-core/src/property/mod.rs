//! Property-based tests for the edge split, normalization, loss and
//! scoring.
//!
//! Graph fixtures are generated from a seeded topology so each failing case
//! can be replayed from its `(topology, seed)` pair.

mod scoring;
mod strategies;
mod structural;
#[cfg(test)]
mod tests;
mod types;
